mod common;

use common::{follower, notes};
use cryptarchia_consensus::{
    testing::{mk_block, mk_chain},
    Applied, Error, Note, SecretKey,
};

#[test]
fn leader_note_cannot_be_reused_on_the_same_branch() {
    let notes = notes(&[100]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();

    let b1 = mk_block(&genesis, 1, &notes[0]);
    assert_eq!(follower.on_block(b1.clone()), Ok(Applied::Extended));

    let reuse = mk_block(&b1, 2, &notes[0]);
    assert_eq!(
        follower.on_block(reuse.clone()),
        Err(Error::InvalidLeaderProof(reuse.id()))
    );

    // a sibling branch has not spent the note
    let sibling = mk_block(&genesis, 2, &notes[0]);
    assert_eq!(follower.on_block(sibling.clone()), Ok(Applied::Forked));
    assert!(follower.forks().contains(&sibling.id()));

    // the evolved note leads right away
    let b2 = mk_block(&b1, 2, &notes[0].evolve());
    assert_eq!(follower.on_block(b2.clone()), Ok(Applied::Extended));
    assert_eq!(follower.tip_id(), b2.id());
}

#[test]
fn unknown_notes_cannot_lead() {
    let notes = notes(&[100]);
    let mut follower = follower(&notes);
    let stranger = Note::new(100, SecretKey::from(42));
    let block = mk_block(follower.tip(), 1, &stranger);
    assert_eq!(
        follower.on_block(block.clone()),
        Err(Error::InvalidLeaderProof(block.id()))
    );
    assert_eq!(follower.block_count(), 1);
}

#[test]
fn reorganisation_restores_the_ledger_of_the_new_branch() {
    let notes = notes(&[100, 100]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();

    let b1 = mk_block(&genesis, 0, &notes[0]);
    let b2 = mk_block(&genesis, 0, &notes[1]);
    assert_eq!(follower.on_block(b1.clone()), Ok(Applied::Extended));
    assert_eq!(follower.on_block(b2.clone()), Ok(Applied::Forked));
    assert_eq!(follower.tip_id(), b1.id());

    let b3 = mk_block(&b2, 1, &notes[1].evolve());
    assert_eq!(
        follower.on_block(b3.clone()),
        Ok(Applied::Reorganized {
            previous_tip: b1.id()
        })
    );
    assert_eq!(follower.tip_id(), b3.id());
    assert_eq!(follower.forks().iter().copied().collect::<Vec<_>>(), vec![b1.id()]);

    // note 0 was only spent on the abandoned branch
    assert!(!follower.tip_state().is_nullified(&notes[0].nullifier()));
    assert!(follower.tip_state().is_nullified(&notes[1].nullifier()));
    let b4 = mk_block(&b3, 2, &notes[0]);
    assert_eq!(follower.on_block(b4), Ok(Applied::Extended));
}

#[test]
fn forks_are_tracked_by_their_tips() {
    let notes = notes(&[100, 100]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();

    let (main, _) = mk_chain(&genesis, notes[0].clone(), &[1, 2, 3]);
    for block in &main {
        assert_eq!(follower.on_block(block.clone()), Ok(Applied::Extended));
    }
    let f1 = mk_block(&main[0], 2, &notes[1]);
    let f2 = mk_block(&f1, 3, &notes[1].evolve());
    assert_eq!(follower.on_block(f1.clone()), Ok(Applied::Forked));
    assert_eq!(follower.on_block(f2.clone()), Ok(Applied::Forked));

    // the tip of the fork replaced its parent
    assert_eq!(follower.forks().len(), 1);
    assert!(follower.forks().contains(&f2.id()));
    assert_eq!(follower.tip_id(), main[2].id());
}

#[test]
fn epoch_transition_uses_the_stake_snapshot() {
    let notes = notes(&[100, 100, 100, 100]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();

    // epochs are 20 slots long
    let (chain, _) = mk_chain(&genesis, notes[0].clone(), &[0, 19, 20]);
    for block in &chain {
        assert_eq!(follower.on_block(block.clone()), Ok(Applied::Extended));
    }

    let minted = Note::new(100, SecretKey::from(4));
    let b4 = mk_block(&chain[2], 40, &minted);
    assert_eq!(
        follower.on_block(b4.clone()),
        Err(Error::InvalidLeaderProof(b4.id()))
    );

    // mint the note in the last block before epoch 1, the stake snapshot
    // of epoch 2
    let snapshot = follower
        .state(&chain[1].id())
        .expect("block 2 is known")
        .mint(minted.commitment());
    follower.force_insert_state(snapshot);

    assert_eq!(follower.on_block(b4.clone()), Ok(Applied::Extended));
    assert_eq!(follower.tip_id(), b4.id());
}

#[test]
fn minted_notes_become_eligible_two_epochs_later() {
    let notes = notes(&[100]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();

    let b0 = mk_block(&genesis, 0, &notes[0]);
    follower.on_block(b0.clone()).unwrap();
    let minted = Note::new(100, SecretKey::from(1));
    let state = follower.state(&b0.id()).unwrap().mint(minted.commitment());
    follower.force_insert_state(state);

    // not in the stake distribution yet
    let early = mk_block(&b0, 1, &minted);
    assert_eq!(
        follower.on_block(early.clone()),
        Err(Error::InvalidLeaderProof(early.id()))
    );
    let b1 = mk_block(&b0, 1, &notes[0].evolve());
    assert_eq!(follower.on_block(b1.clone()), Ok(Applied::Extended));

    // epoch 1 still uses the genesis distribution
    let epoch_1 = mk_block(&b1, 20, &minted);
    assert_eq!(
        follower.on_block(epoch_1.clone()),
        Err(Error::InvalidLeaderProof(epoch_1.id()))
    );

    // epoch 2 uses the last state before epoch 1: b1, which holds the note
    let epoch_2 = mk_block(&b1, 40, &minted);
    assert_eq!(follower.on_block(epoch_2.clone()), Ok(Applied::Extended));

    // and its evolution follows right after
    let next = mk_block(&epoch_2, 41, &minted.evolve());
    assert_eq!(follower.on_block(next), Ok(Applied::Extended));
}

#[test]
fn on_block_twice_changes_nothing() {
    let notes = notes(&[100]);
    let mut follower = follower(&notes);
    let genesis = follower.tip().clone();
    let (chain, _) = mk_chain(&genesis, notes[0].clone(), &[1, 2]);
    for block in &chain {
        follower.on_block(block.clone()).unwrap();
    }
    let tip = follower.tip_state().clone();
    let count = follower.block_count();

    for block in &chain {
        assert_eq!(follower.on_block(block.clone()), Ok(Applied::AlreadyKnown));
    }
    assert_eq!(follower.tip_state(), &tip);
    assert_eq!(follower.block_count(), count);
    assert!(follower.forks().is_empty());
}
