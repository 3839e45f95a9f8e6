//! Nebenlaeufige Join/Exit/Close/Broadcast-Folgen auf einem Channel
//!
//! Laeuft auf einer Multi-Thread-Runtime; zufaellige `yield_now`-Pausen
//! verwuerfeln die Reihenfolge der Tasks in jeder Runde neu.

use rand::Rng;
use rundfunk_channel::Channel;
use rundfunk_core::{ProtocolSide, SessionId};
use rundfunk_protocol::{PacketProtocol, Text};
use rundfunk_session::{MockSession, Session};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const SESSIONS: usize = 64;
const EXITS: usize = 16;
const CLOSES: usize = 16;
const BROADCASTS: usize = 4;
const RUNDEN: usize = 25;

fn zufaellige_pausen() -> usize {
    rand::thread_rng().gen_range(0..8)
}

async fn pausieren(anzahl: usize) {
    for _ in 0..anzahl {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn nebenlaeufige_operationen_bleiben_konsistent() {
    for runde in 0..RUNDEN {
        let kanal = Arc::new(Channel::neu(&PacketProtocol::new(), ProtocolSide::Server).unwrap());
        let sessions: Vec<Arc<MockSession>> = (0..SESSIONS).map(|_| MockSession::neu()).collect();

        // Phase 1: alle treten gleichzeitig bei
        let mut joins = Vec::new();
        for session in &sessions {
            let k = Arc::clone(&kanal);
            let s = Arc::clone(session);
            let pausen = zufaellige_pausen();
            joins.push(tokio::spawn(async move {
                pausieren(pausen).await;
                k.join(s, None);
            }));
        }
        for join in joins {
            join.await.unwrap();
        }
        assert_eq!(kanal.len(), SESSIONS, "Runde {runde}: verlorener Join");

        // Phase 2: Exits, Closes und Broadcasts durcheinander
        let (gehen, rest) = sessions.split_at(EXITS);
        let (schliessen, bleiben) = rest.split_at(CLOSES);

        let mut aenderungen = Vec::new();
        for session in gehen {
            let k = Arc::clone(&kanal);
            let s = Arc::clone(session);
            let pausen = zufaellige_pausen();
            aenderungen.push(tokio::spawn(async move {
                pausieren(pausen).await;
                k.exit(&*s);
            }));
        }
        for session in schliessen {
            let s = Arc::clone(session);
            let pausen = zufaellige_pausen();
            aenderungen.push(tokio::spawn(async move {
                pausieren(pausen).await;
                s.schliessen();
            }));
        }

        let mut broadcasts = Vec::new();
        for i in 0..BROADCASTS {
            let k = Arc::clone(&kanal);
            let pausen = zufaellige_pausen();
            broadcasts.push(tokio::spawn(async move {
                pausieren(pausen).await;
                let works = k
                    .broadcast(&Text::neu(format!("nachricht {i}")), Duration::ZERO)
                    .unwrap();
                let anzahl = works.len();
                for bw in works {
                    // Geschlossene Sessions duerfen scheitern, alle anderen nicht
                    let _ = bw.work.await;
                }
                anzahl
            }));
        }

        for aenderung in aenderungen {
            aenderung.await.unwrap();
        }
        for broadcast in broadcasts {
            let empfaenger = broadcast.await.unwrap();
            assert!(
                (bleiben.len()..=SESSIONS).contains(&empfaenger),
                "Runde {runde}: {empfaenger} Empfaenger ausserhalb des gueltigen Bereichs"
            );
        }

        // Endzustand muss genau den verbliebenen Sessions entsprechen
        assert_eq!(kanal.len(), bleiben.len(), "Runde {runde}");
        let mut ids = BTreeSet::new();
        kanal.fetch(|s| {
            assert!(ids.insert(s.id()), "Runde {runde}: doppeltes Mitglied");
        });
        let erwartet: BTreeSet<SessionId> = bleiben.iter().map(|s| s.id()).collect();
        assert_eq!(ids, erwartet, "Runde {runde}");

        // Wer blieb, hat jeden Broadcast genau einmal bekommen
        for session in bleiben {
            assert_eq!(session.sendungen(), BROADCASTS, "Runde {runde}");
        }
        // Wer ging, hat hoechstens jeden Broadcast einmal bekommen
        for session in gehen {
            assert!(session.sendungen() <= BROADCASTS);
            assert_eq!(session.close_callbacks(), 0);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wiederholte_joins_derselben_session_ergeben_ein_mitglied() {
    let kanal = Arc::new(Channel::neu(&PacketProtocol::new(), ProtocolSide::Server).unwrap());
    let session = MockSession::neu();

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let k = Arc::clone(&kanal);
        let s = Arc::clone(&session);
        let pausen = zufaellige_pausen();
        tasks.push(tokio::spawn(async move {
            pausieren(pausen).await;
            k.join(s, None);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(kanal.len(), 1);
    assert_eq!(session.close_callbacks(), 1);
}
