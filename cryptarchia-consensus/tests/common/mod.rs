#![allow(dead_code)]

use cryptarchia_consensus::{
    testing::{mk_config, mk_genesis_state},
    Config, Error, Follower, Header, Note, SecretKey,
};

/// one note per value, secret keys numbered from 0
pub fn notes(values: &[u64]) -> Vec<Note> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| Note::new(*value, SecretKey::from(i as u64)))
        .collect()
}

pub fn follower(notes: &[Note]) -> Follower {
    follower_with_config(notes, mk_config(notes))
}

pub fn follower_with_k(notes: &[Note], k: u64) -> Follower {
    follower_with_config(notes, Config { k, ..mk_config(notes) })
}

pub fn follower_with_config(notes: &[Note], config: Config) -> Follower {
    Follower::new(mk_genesis_state(notes), config).expect("valid test configuration")
}

/// Feed `blocks` in the given order, submitting again the blocks whose
/// parent was missing until no more progress is made.
///
/// Returns the blocks refused for any other reason.
pub fn deliver(follower: &mut Follower, blocks: Vec<Header>) -> Vec<(Header, Error)> {
    let mut pending = blocks;
    let mut refused = Vec::new();
    loop {
        let before = pending.len();
        let mut orphans = Vec::new();
        for block in pending {
            match follower.on_block(block.clone()) {
                Ok(_) => {}
                Err(error) if error.is_recoverable() => orphans.push(block),
                Err(error) => refused.push((block, error)),
            }
        }
        if orphans.is_empty() || orphans.len() == before {
            return refused;
        }
        pending = orphans;
    }
}
