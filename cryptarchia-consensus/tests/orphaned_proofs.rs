mod common;

use common::{follower, notes};
use cryptarchia_consensus::{
    testing::{mk_block, mk_block_with_orphans},
    Applied, Error, Header, HeaderId,
};
use std::collections::HashSet;

fn ids(blocks: &[Header]) -> HashSet<HeaderId> {
    blocks.iter().map(Header::id).collect()
}

#[test]
fn fork_proof_is_imported_by_the_next_block() {
    let notes = notes(&[10, 10]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();
    let (n_a, n_b) = (notes[0].clone(), notes[1].clone());

    //   b2 == tip
    //  /
    // b1
    //  \
    //   b3
    let b1 = mk_block(&genesis, 1, &n_a);
    let b2 = mk_block(&b1, 2, &n_a.evolve());
    let b3 = mk_block(&b1, 2, &n_b);
    for block in &[b1, b2.clone(), b3.clone()] {
        follower.on_block(block.clone()).unwrap();
    }
    assert_eq!(follower.tip_id(), b2.id());
    assert_eq!(follower.forks().iter().copied().collect::<Vec<_>>(), vec![b3.id()]);
    assert_eq!(follower.unimported_orphans(b2.id()), vec![b3.clone()]);

    let b4 = mk_block_with_orphans(&b2, 3, &n_a.evolve().evolve(), &[b3.clone()]);
    assert_eq!(follower.on_block(b4.clone()), Ok(Applied::Extended));
    assert_eq!(follower.tip_id(), b4.id());
    assert!(follower.forks().contains(&b3.id()));
    assert!(follower.unimported_orphans(b4.id()).is_empty());

    // the note of b3 is now spent on the main branch
    let state = follower.tip_state();
    assert!(state.is_nullified(&n_b.nullifier()));
    assert!(state.lead_commitments().contains(&n_b.evolve().commitment()));
    assert_eq!(state.leader_count(), 4);
}

#[test]
fn long_running_fork_is_imported_oldest_first() {
    let notes = notes(&[10, 10]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();
    let (n_a, n_b) = (notes[0].clone(), notes[1].clone());

    //   b2 - b3 == tip
    //  /
    // b1
    //  \
    //   b4 - b5
    let b1 = mk_block(&genesis, 1, &n_a);
    let b2 = mk_block(&b1, 2, &n_a.evolve());
    let b3 = mk_block(&b2, 3, &n_a.evolve().evolve());
    let b4 = mk_block(&b1, 2, &n_b);
    let b5 = mk_block(&b4, 3, &n_b.evolve());
    for block in &[b1, b2, b3.clone(), b4.clone(), b5.clone()] {
        follower.on_block(block.clone()).unwrap();
    }
    assert_eq!(follower.tip_id(), b3.id());
    assert_eq!(follower.unimported_orphans(b3.id()), vec![b4.clone(), b5.clone()]);

    // b5 only leads with the note b4 evolved, so b4 has to come first
    let wrong_order = mk_block_with_orphans(
        &b3,
        4,
        &n_a.evolve().evolve().evolve(),
        &[b5.clone(), b4.clone()],
    );
    assert_eq!(
        follower.on_block(wrong_order.clone()),
        Err(Error::InvalidOrphanProof {
            block: wrong_order.id(),
            orphan: b5.id(),
        })
    );

    let b6 = mk_block_with_orphans(&b3, 4, &n_a.evolve().evolve().evolve(), &[b4, b5.clone()]);
    assert_eq!(follower.on_block(b6.clone()), Ok(Applied::Extended));
    assert_eq!(follower.tip_id(), b6.id());
    assert_eq!(follower.forks().iter().copied().collect::<Vec<_>>(), vec![b5.id()]);
}

#[test]
fn fork_without_direct_shared_parent_is_imported() {
    let notes = notes(&[10, 10]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();
    let (n_a, n_b) = (notes[0].clone(), notes[1].clone());

    //   b2 - b3 - b4 == tip
    //  /
    // b1
    //  \
    //   b5 - b6 - b7
    let b1 = mk_block(&genesis, 1, &n_a);
    let b2 = mk_block(&b1, 2, &n_a.evolve());
    let b3 = mk_block(&b2, 3, &n_a.evolve().evolve());
    let b4 = mk_block(&b3, 4, &n_a.evolve().evolve().evolve());
    let b5 = mk_block(&b1, 2, &n_b);
    let b6 = mk_block(&b5, 3, &n_b.evolve());
    let b7 = mk_block(&b6, 4, &n_b.evolve().evolve());
    for block in &[b1, b2, b3, b4.clone(), b5.clone(), b6.clone(), b7.clone()] {
        follower.on_block(block.clone()).unwrap();
    }
    assert_eq!(follower.tip_id(), b4.id());
    let orphans = vec![b5, b6, b7.clone()];
    assert_eq!(follower.unimported_orphans(b4.id()), orphans);

    let b8 = mk_block_with_orphans(&b4, 5, &n_a.evolve().evolve().evolve().evolve(), &orphans);
    assert_eq!(follower.on_block(b8.clone()), Ok(Applied::Extended));
    assert_eq!(follower.forks().iter().copied().collect::<Vec<_>>(), vec![b7.id()]);
    assert!(follower.unimported_orphans(b8.id()).is_empty());
}

#[test]
fn unimported_orphans_cover_every_fork_once() {
    let notes = notes(&[10, 10, 10]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();
    let (n_a, n_b, n_c) = (notes[0].clone(), notes[1].clone(), notes[2].clone());

    //   b2 - b3 == tip
    //  /
    // b1
    //  \
    //   b4 - b5
    //    \
    //     b6
    let b1 = mk_block(&genesis, 1, &n_a);
    let b2 = mk_block(&b1, 2, &n_a.evolve());
    let b3 = mk_block(&b2, 3, &n_a.evolve().evolve());
    let b4 = mk_block(&b1, 2, &n_b);
    let b5 = mk_block(&b4, 3, &n_b.evolve());
    let b6 = mk_block(&b4, 3, &n_c);
    for block in &[b1, b2, b3.clone(), b4.clone(), b5.clone(), b6.clone()] {
        follower.on_block(block.clone()).unwrap();
    }
    assert_eq!(follower.tip_id(), b3.id());
    assert_eq!(follower.forks().len(), 2);

    let orphans = follower.unimported_orphans(b3.id());
    // b4 is shared by both forks and listed once
    assert_eq!(orphans.len(), 3);
    assert_eq!(ids(&orphans), ids(&[b4.clone(), b5.clone(), b6.clone()]));
    assert!(orphans.iter().position(|b| b.id() == b4.id()) < orphans.iter().position(|b| b.id() == b5.id()));

    let b7 = mk_block_with_orphans(&b3, 4, &n_a.evolve().evolve().evolve(), &orphans);
    assert_eq!(follower.on_block(b7.clone()), Ok(Applied::Extended));
    assert_eq!(follower.tip_id(), b7.id());
    assert!(follower.unimported_orphans(b7.id()).is_empty());
}

#[test]
fn orphans_importing_orphans_are_imported_transitively() {
    let notes = notes(&[10, 10]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();
    let (mut n_a, mut n_b) = (notes[0].clone(), notes[1].clone());

    // b1(a) - b2(a) - b3(a) - b4(b) - b6(b, o=b5) - b8(b, o=b7)
    //                    \       \
    //                     b5(a)   b7(a, o=b5)
    let b1 = mk_block(&genesis, 1, &n_a);
    n_a = n_a.evolve();
    let b2 = mk_block(&b1, 2, &n_a);
    n_a = n_a.evolve();
    let b3 = mk_block(&b2, 3, &n_a);
    n_a = n_a.evolve();
    let b4 = mk_block(&b3, 4, &n_b);
    n_b = n_b.evolve();
    let b5 = mk_block(&b3, 4, &n_a);
    n_a = n_a.evolve();
    let b6 = mk_block_with_orphans(&b4, 5, &n_b, &[b5.clone()]);
    n_b = n_b.evolve();
    // b7 leads with the note b5 evolved, never committed on the b4 branch
    let b7 = mk_block_with_orphans(&b4, 5, &n_a, &[b5.clone()]);
    let b8 = mk_block_with_orphans(&b6, 6, &n_b, &[b7.clone()]);

    for block in &[b1, b2, b3, b4.clone(), b5.clone()] {
        follower.on_block(block.clone()).unwrap();
    }
    assert_eq!(follower.tip_id(), b4.id());
    assert_eq!(follower.unimported_orphans(b4.id()), vec![b5]);

    for block in &[b6.clone(), b7.clone()] {
        follower.on_block(block.clone()).unwrap();
    }
    assert_eq!(follower.tip_id(), b6.id());
    assert_eq!(follower.unimported_orphans(b6.id()), vec![b7]);

    assert_eq!(follower.on_block(b8.clone()), Ok(Applied::Extended));
    assert_eq!(follower.tip_id(), b8.id());
    assert!(follower.unimported_orphans(b8.id()).is_empty());
}

#[test]
fn orphans_must_be_seen_before_being_imported() {
    let notes = notes(&[100, 100]);
    let (note, orphan_note) = (notes[0].clone(), notes[1].clone());
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();

    let b0 = mk_block(&genesis, 0, &note);
    assert_eq!(follower.on_block(b0.clone()), Ok(Applied::Extended));

    // evolved twice, the note was never committed
    let skipped = mk_block(&b0, 1, &note.evolve().evolve());
    assert_eq!(
        follower.on_block(skipped.clone()),
        Err(Error::InvalidLeaderProof(skipped.id()))
    );
    assert_eq!(follower.tip_id(), b0.id());

    // the block leads with the evolution of the orphan's note, only
    // committed once the orphan is imported
    let orphan = mk_block(&genesis, 0, &orphan_note);
    let b1 = mk_block_with_orphans(&b0, 1, &orphan_note.evolve(), &[orphan.clone()]);
    let refused = follower.on_block(b1.clone());
    assert_eq!(
        refused,
        Err(Error::MissingOrphanProof {
            block: b1.id(),
            orphan: orphan.id(),
        })
    );
    assert!(!refused.unwrap_err().is_recoverable());
    assert_eq!(follower.tip_id(), b0.id());

    assert_eq!(follower.on_block(orphan), Ok(Applied::Forked));
    assert_eq!(follower.on_block(b1.clone()), Ok(Applied::Extended));
    assert_eq!(follower.tip_id(), b1.id());
}

#[test]
fn an_orphan_cannot_be_imported_twice() {
    let notes = notes(&[10, 10]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();
    let (n_a, n_b) = (notes[0].clone(), notes[1].clone());

    let b1 = mk_block(&genesis, 1, &n_a);
    let orphan = mk_block(&genesis, 1, &n_b);
    let b2 = mk_block_with_orphans(&b1, 2, &n_a.evolve(), &[orphan.clone()]);
    for block in &[b1, orphan.clone(), b2.clone()] {
        follower.on_block(block.clone()).unwrap();
    }

    let again = mk_block_with_orphans(&b2, 3, &n_a.evolve().evolve(), &[orphan.clone()]);
    assert_eq!(
        follower.on_block(again.clone()),
        Err(Error::InvalidOrphanProof {
            block: again.id(),
            orphan: orphan.id(),
        })
    );
    assert_eq!(follower.tip_id(), b2.id());
}
