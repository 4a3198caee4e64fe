// Copyright 2024 Campus Rooms Team.
//
// Unread counts must match the message ledger after any interleaving of
// send, mark-read and delete operations.

use std::collections::HashSet;
use std::sync::Arc;

use campus_chat::{ChatConfig, ChatService};
use campus_store::{MessageStore, StaticDirectory};
use tempfile::NamedTempFile;

const USERS: [&str; 3] = ["ana", "ben", "cho"];
const LISTINGS: [&str; 2] = ["L1", "L2"];

/// Expected state of one message
struct Expected {
    listing: &'static str,
    sender: &'static str,
    receiver: &'static str,
    read: bool,
    deleted_by: HashSet<&'static str>,
}

fn expected_unread(model: &[Expected], user: &str) -> u64 {
    model
        .iter()
        .filter(|m| m.receiver == user && !m.read && !m.deleted_by.contains(user))
        .count() as u64
}

/// Small deterministic generator so failures are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) % bound as u64) as usize
    }

    fn pair(&mut self) -> (&'static str, &'static str) {
        let a = self.next(USERS.len());
        let b = (a + 1 + self.next(USERS.len() - 1)) % USERS.len();
        (USERS[a], USERS[b])
    }
}

async fn run_sequence(seed: u64, steps: usize) {
    let temp_file = NamedTempFile::new().unwrap();
    let store = MessageStore::new(temp_file.path().to_path_buf())
        .await
        .expect("Failed to create message store");
    let service = ChatService::new(
        Arc::new(store),
        Arc::new(StaticDirectory::new()),
        ChatConfig::default(),
    );

    let mut rng = Lcg(seed);
    let mut model: Vec<Expected> = Vec::new();

    for step in 0..steps {
        let listing = LISTINGS[rng.next(LISTINGS.len())];
        let (user, counterpart) = rng.pair();

        match rng.next(4) {
            0 | 1 => {
                service
                    .send(listing, user, counterpart, &format!("step {}", step))
                    .await
                    .unwrap();
                model.push(Expected {
                    listing,
                    sender: user,
                    receiver: counterpart,
                    read: false,
                    deleted_by: HashSet::new(),
                });
            }
            2 => {
                service.mark_read(listing, user, counterpart).await.unwrap();
                for m in model.iter_mut().filter(|m| {
                    m.listing == listing && m.sender == counterpart && m.receiver == user
                }) {
                    m.read = true;
                }
            }
            _ => {
                service
                    .delete_conversation(listing, user, counterpart)
                    .await
                    .unwrap();
                for m in model.iter_mut().filter(|m| {
                    m.listing == listing
                        && ((m.sender == user && m.receiver == counterpart)
                            || (m.sender == counterpart && m.receiver == user))
                }) {
                    m.deleted_by.insert(user);
                }
            }
        }

        for user in USERS {
            assert_eq!(
                service.unread_count(user).await.unwrap(),
                expected_unread(&model, user),
                "unread count for {} after step {} (seed {})",
                user,
                step,
                seed
            );
        }
    }

    // The conversation list agrees with the per-user total
    for user in USERS {
        let total: u64 = service
            .conversations(user)
            .await
            .unwrap()
            .iter()
            .map(|c| c.unread_count)
            .sum();
        assert_eq!(total, expected_unread(&model, user));
    }
}

#[tokio::test]
async fn test_unread_matches_ledger_seed_1() {
    run_sequence(1, 60).await;
}

#[tokio::test]
async fn test_unread_matches_ledger_seed_42() {
    run_sequence(42, 60).await;
}

#[tokio::test]
async fn test_unread_matches_ledger_seed_2024() {
    run_sequence(2024, 60).await;
}
