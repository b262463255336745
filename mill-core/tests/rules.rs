//! Rules engine scenarios and randomized invariant checks.
//!
//! Scenario tests walk through the core transitions (placement, mill,
//! removal, flying, range checks). The playout tests drive seeded random games
//! through `legal_actions` and check the board invariants after every step.

use mill_core::{Action, Board, Phase, Player, Pos, RulesError, Snapshot, Violation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn board_with(one: &[i32], two: &[i32], unplaced: [u8; 2], turn: Player) -> Board {
    let one: Vec<Pos> = one.iter().copied().map(Pos).collect();
    let two: Vec<Pos> = two.iter().copied().map(Pos).collect();
    let snapshot = Snapshot::from_pieces(&one, &two, unplaced, turn).expect("valid layout");
    Board::from_snapshot(snapshot).expect("consistent snapshot")
}

/// Check every structural invariant of a board.
fn assert_invariants(board: &Board) {
    for pos in Pos::all() {
        let empty = board.is_empty(pos).unwrap();
        let one = board.owns_piece(Player::One, pos).unwrap();
        let two = board.owns_piece(Player::Two, pos).unwrap();
        assert_eq!(
            [empty, one, two].iter().filter(|&&b| b).count(),
            1,
            "position {pos} is not in exactly one state"
        );
    }

    for player in Player::all() {
        let owned = Pos::all()
            .filter(|&pos| board.owns_piece(player, pos).unwrap())
            .count() as u8;
        assert_eq!(owned, board.on_board_count(player));
        assert_eq!(
            board.live_count(player),
            board.unplaced_count(player) + owned,
            "{player:?} live count drifted"
        );
        if board.unplaced_count(player) == 0 {
            assert_eq!(board.live_count(player), owned);
        }
        assert!(board.live_count(player) <= 9);
    }

    for pos in Pos::all() {
        if board.is_mill(pos).unwrap() {
            for player in Player::all() {
                assert!(!board.is_valid_removal(player, pos), "mill piece {pos} removable");
            }
        }
    }

    let expected_over = Player::all().any(|p| board.live_count(p) <= 2)
        || Player::all().any(|p| !board.has_legal_moves(p));
    assert_eq!(board.is_game_over(), expected_over);
    assert_eq!(board.is_game_over(), board.loser().is_some());
}

/// Check `legal_actions` against the predicates over every position pair.
fn assert_actions_match_predicates(board: &Board) {
    let player = board.turn();
    let actions = board.legal_actions();
    let mut expected = Vec::new();
    for a in Pos::all() {
        if board.is_valid_placement(player, a) {
            expected.push(Action::Place { to: a });
        }
        if board.is_valid_removal(player, a) {
            expected.push(Action::Remove { at: a });
        }
    }
    for from in Pos::all() {
        for to in Pos::all() {
            if board.is_valid_slide_or_fly(player, to, from) {
                expected.push(Action::Slide { from, to });
            }
        }
    }
    let mut sorted = actions.clone();
    sorted.sort_by_key(|a| format!("{a:?}"));
    expected.sort_by_key(|a| format!("{a:?}"));
    assert_eq!(sorted, expected);
}

// ========== Scenarios ==========

#[test]
fn test_first_placement_passes_turn() {
    let mut board = Board::new();
    assert_eq!(board.place(Player::One, Pos(0)), Ok(false));
    assert_eq!(board.turn(), Player::Two);
    assert_eq!(board.phase(), Phase::Move);
    assert!(board.is_turn(Player::Two));
    assert!(!board.is_turn(Player::One));
}

#[test]
fn test_closing_mill_keeps_turn() {
    let mut board = board_with(&[0, 1], &[9, 21, 22, 23], [7, 5], Player::One);
    assert_eq!(board.place(Player::One, Pos(2)), Ok(true));
    assert_eq!(board.phase(), Phase::Remove);
    assert_eq!(board.turn(), Player::One);
    assert_eq!(board.unplaced_count(Player::One), 6);
}

#[test]
fn test_removal_after_mill() {
    let mut board = board_with(&[0, 1], &[9, 21, 22, 23], [7, 5], Player::One);
    board.place(Player::One, Pos(2)).unwrap();

    // 22 sits in Two's bottom row mill while 9 is unprotected.
    assert_eq!(
        board.remove_piece(Player::One, Pos(22)),
        Err(RulesError::InvalidAction(Violation::InMill(Pos(22))))
    );
    assert_eq!(board.phase(), Phase::Remove);

    assert_eq!(board.remove_piece(Player::One, Pos(9)), Ok(()));
    assert_eq!(board.live_count(Player::Two), 8);
    assert_eq!(board.phase(), Phase::Move);
    assert_eq!(board.turn(), Player::Two);
    assert_eq!(board.is_empty(Pos(9)), Ok(true));
    assert_invariants(&board);
}

#[test]
fn test_three_pieces_fly_anywhere() {
    let mut board = board_with(&[0, 4, 23], &[2, 10, 13, 19, 21], [0, 0], Player::One);
    assert!(board.can_fly(Player::One));
    assert!(!board.can_fly(Player::Two));
    assert_eq!(board.are_adjacent(Pos(15), Pos(0)), Ok(false));
    assert!(board.is_valid_slide_or_fly(Player::One, Pos(15), Pos(0)));

    assert_eq!(board.slide_or_fly(Player::One, Pos(15), Pos(0)), Ok(false));
    assert_eq!(board.turn(), Player::Two);
    assert_eq!(
        board.check_slide_or_fly(Player::Two, Pos(22), Pos(2)),
        Err(Violation::NotAdjacent {
            from: Pos(2),
            to: Pos(22)
        })
    );
}

#[test]
fn test_out_of_range_positions_rejected() {
    let mut board = Board::new();
    for pos in [Pos(24), Pos(-1)] {
        assert!(!board.is_valid_position(pos));
        assert_eq!(board.is_empty(pos), Err(RulesError::OutOfRange(pos)));
        assert_eq!(board.is_mill(pos), Err(RulesError::OutOfRange(pos)));
        assert_eq!(
            board.place(Player::One, pos),
            Err(RulesError::InvalidAction(Violation::OutOfRange(pos)))
        );
        assert_eq!(
            board.slide_or_fly(Player::One, Pos(0), pos),
            Err(RulesError::InvalidAction(Violation::OutOfRange(pos)))
        );
        assert_eq!(
            board.remove_piece(Player::One, pos),
            Err(RulesError::InvalidAction(Violation::OutOfRange(pos)))
        );
    }
    assert_eq!(board, Board::new());
}

#[test]
fn test_placement_stage_ends_when_both_hands_empty() {
    let board = board_with(&[0, 4, 6], &[2, 10], [0, 1], Player::Two);
    assert!(board.is_placement_phase());
    assert!(board.has_unplaced(Player::Two));
    assert!(!board.has_unplaced(Player::One));

    let mut board = board;
    board.place(Player::Two, Pos(16)).unwrap();
    assert!(!board.is_placement_phase());
    assert_eq!(board.turn(), Player::One);
    assert_eq!(
        board.check_placement(Player::One, Pos(5)),
        Err(Violation::NoUnplacedPieces(Player::One))
    );
}

#[test]
fn test_flying_fixture_from_json() {
    let json = r#"{
        "cells": [
            "One", null, "Two", null, "One", null, null, null,
            null, null, "Two", null, null, "Two", null, null,
            null, null, null, "Two", null, "Two", null, "One"
        ],
        "turn": "One",
        "phase": "move",
        "unplaced": [0, 0],
        "live": [3, 5]
    }"#;
    let snapshot: Snapshot = serde_json::from_str(json).expect("fixture parses");
    let board = Board::from_snapshot(snapshot).expect("fixture is consistent");
    assert_eq!(
        board,
        board_with(&[0, 4, 23], &[2, 10, 13, 19, 21], [0, 0], Player::One)
    );
    assert!(board.can_fly(Player::One));
    assert_actions_match_predicates(&board);
    // Three pieces, each with 16 empty destinations.
    assert_eq!(board.legal_actions().len(), 48);
}

#[test]
fn test_inconsistent_fixture_rejected() {
    let json = r#"{
        "cells": [
            "One", null, null, null, null, null, null, null,
            null, null, null, null, null, null, null, null,
            null, null, null, null, null, null, null, null
        ],
        "turn": "Two",
        "phase": "move",
        "unplaced": [8, 9],
        "live": [8, 9]
    }"#;
    let snapshot: Snapshot = serde_json::from_str(json).expect("fixture parses");
    assert!(matches!(
        Board::from_snapshot(snapshot),
        Err(RulesError::InconsistentSnapshot(_))
    ));
}

#[test]
fn test_action_json_shape() {
    let action = Action::Slide {
        from: Pos(3),
        to: Pos(4),
    };
    let value = serde_json::to_value(action).unwrap();
    assert_eq!(value, serde_json::json!({"type": "slide", "from": 3, "to": 4}));

    let parsed: Action = serde_json::from_str(r#"{"type":"remove","at":7}"#).unwrap();
    assert_eq!(parsed, Action::Remove { at: Pos(7) });
}

// ========== Random Playouts ==========

fn play_random_game(seed: u64, max_steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut board = Board::new();
    assert_invariants(&board);

    for _ in 0..max_steps {
        if board.is_game_over() {
            break;
        }
        assert_actions_match_predicates(&board);
        let actions = board.legal_actions();
        if actions.is_empty() {
            // A remover still holding pieces is not out of moves even when every
            // opponent piece sits in a mill.
            assert_eq!(board.phase(), Phase::Remove);
            assert!(board.has_unplaced(board.turn()));
            break;
        }

        // Occasionally try a random, probably illegal, action first.
        if rng.random_bool(0.3) {
            let pos = Pos(rng.random_range(-2..26));
            let other = Pos(rng.random_range(-2..26));
            let player = if rng.random_bool(0.5) { Player::One } else { Player::Two };
            let attempt = match rng.random_range(0..3) {
                0 => Action::Place { to: pos },
                1 => Action::Slide { from: other, to: pos },
                _ => Action::Remove { at: pos },
            };
            let before = board;
            if board.apply(player, attempt).is_err() {
                assert_eq!(board, before, "failed action mutated the board");
            }
            assert_invariants(&board);
            continue;
        }

        let action = actions[rng.random_range(0..actions.len())];
        let player = board.turn();
        let opponent = player.opponent();
        let opponent_live = board.live_count(opponent);

        let mill = board.apply(player, action).expect("listed action is legal");

        match action {
            Action::Remove { at } => {
                assert!(!mill);
                assert_eq!(board.phase(), Phase::Move);
                assert_eq!(board.turn(), opponent);
                assert_eq!(board.live_count(opponent), opponent_live - 1);
                assert_eq!(board.is_empty(at), Ok(true));
            }
            Action::Place { to } | Action::Slide { to, .. } => {
                assert_eq!(board.owns_piece(player, to), Ok(true));
                assert_eq!(board.is_mill(to), Ok(mill));
                if mill {
                    assert_eq!(board.phase(), Phase::Remove);
                    assert_eq!(board.turn(), player);
                } else {
                    assert_eq!(board.phase(), Phase::Move);
                    assert_eq!(board.turn(), opponent);
                }
                assert_eq!(board.live_count(opponent), opponent_live);
            }
        }
        assert_invariants(&board);
    }
}

#[test]
fn test_random_playouts_keep_invariants() {
    for seed in 0..40 {
        play_random_game(seed, 400);
    }
}

#[test]
fn test_random_playouts_reach_movement_stage() {
    let mut reached = 0;
    for seed in 100..140 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut board = Board::new();
        while board.is_placement_phase() && !board.is_game_over() {
            let actions = board.legal_actions();
            if actions.is_empty() {
                break;
            }
            let action = actions[rng.random_range(0..actions.len())];
            board.apply(board.turn(), action).unwrap();
        }
        if !board.is_placement_phase() {
            reached += 1;
            assert_invariants(&board);
            for player in Player::all() {
                assert_eq!(board.unplaced_count(player), 0);
            }
        }
    }
    assert!(reached > 0);
}
