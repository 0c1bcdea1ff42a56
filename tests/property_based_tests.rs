//! プロパティベーステストモジュール
//! ランダムな着手列や盤面で三目並べのルールと対局進行の不変条件を検証する。

use proptest::prelude::*;
use std::sync::Arc;

use TicTacToe::{
    ai::{create_policy, PolicyKind},
    api::{MoveStatus, OpponentChoice, SessionCoordinator},
    auth::UserStore,
    game::{Board, Cell, Mark, Participant, ParticipantId, Position, Session, TicTacToeRules},
    session::{NotificationHub, SessionStore},
};

/// 有効な座標を生成する戦略
fn position_strategy() -> impl Strategy<Value = Position> {
    (0usize..3, 0usize..3).prop_map(|(row, col)| Position::new(row, col).unwrap())
}

/// ランダム着手シーケンスを生成する戦略
fn move_sequence_strategy() -> impl Strategy<Value = Vec<Position>> {
    prop::collection::vec(position_strategy(), 0..20)
}

fn cell_strategy() -> impl Strategy<Value = Cell> {
    prop_oneof![Just(Cell::Empty), Just(Cell::X), Just(Cell::O)]
}

/// 任意のマス配置（通常の対局で到達できない盤面も含む）
fn board_strategy() -> impl Strategy<Value = Board> {
    prop::array::uniform3(prop::array::uniform3(cell_strategy())).prop_map(Board::from_cells)
}

fn policy_strategy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![Just(PolicyKind::FirstAvailable), Just(PolicyKind::Minimax)]
}

fn swap_marks(board: &Board) -> Board {
    let mut cells = [[Cell::Empty; 3]; 3];
    for position in Position::all() {
        cells[position.row()][position.col()] = match board.get_cell(position) {
            Cell::X => Cell::O,
            Cell::O => Cell::X,
            Cell::Empty => Cell::Empty,
        };
    }
    Board::from_cells(cells)
}

/// 着手列を交互に適用し、終局後は受け付けない
fn replay(moves: &[Position]) -> Session {
    let bob = Participant::Human(ParticipantId::new("bob"));
    let mut session = Session::new(1, ParticipantId::new("alice"), bob);
    for &position in moves {
        if session.is_finished() {
            break;
        }
        let mark = session.next_turn;
        let applied = TicTacToeRules::apply_move(&session.board, position, mark, session.next_turn);
        if applied.accepted {
            session.record_move(position, mark, applied.board);
        }
    }
    session
}

proptest! {
    #[test]
    fn prop_mark_counts_alternate(moves in move_sequence_strategy()) {
        let session = replay(&moves);
        let (x_count, o_count) = session.board.count_marks();

        prop_assert!(x_count == o_count || x_count == o_count + 1);
        prop_assert_eq!(session.move_count(), (x_count + o_count) as usize);
        let expected_turn = if x_count == o_count { Mark::X } else { Mark::O };
        prop_assert_eq!(session.next_turn, expected_turn);
    }

    #[test]
    fn prop_finished_session_is_consistent(moves in move_sequence_strategy()) {
        let session = replay(&moves);
        let snapshot = session.snapshot();

        if session.is_finished() {
            prop_assert_eq!(snapshot.next_turn, None);
        } else {
            prop_assert!(!session.board.is_full());
            prop_assert_eq!(TicTacToeRules::detect_winner(&session.board), None);
        }
        prop_assert_eq!(snapshot.winner, TicTacToeRules::detect_winner(&session.board));
    }

    #[test]
    fn prop_occupied_cell_never_accepted(
        board in board_strategy(),
        position in position_strategy(),
    ) {
        prop_assume!(!board.is_empty(position));

        for mark in [Mark::X, Mark::O] {
            let applied = TicTacToeRules::apply_move(&board, position, mark, mark);
            prop_assert!(!applied.accepted);
            prop_assert_eq!(applied.board, board);
        }
    }

    #[test]
    fn prop_wrong_turn_never_accepted(board in board_strategy(), position in position_strategy()) {
        let applied = TicTacToeRules::apply_move(&board, position, Mark::X, Mark::O);
        prop_assert!(!applied.accepted);
        prop_assert_eq!(applied.board, board);
    }

    #[test]
    fn prop_accepted_move_changes_exactly_one_cell(
        board in board_strategy(),
        position in position_strategy(),
    ) {
        prop_assume!(board.is_empty(position));

        let applied = TicTacToeRules::apply_move(&board, position, Mark::O, Mark::O);
        prop_assert!(applied.accepted);
        prop_assert_eq!(applied.board.get_cell(position), Cell::O);
        let changed = Position::all()
            .filter(|p| applied.board.get_cell(*p) != board.get_cell(*p))
            .count();
        prop_assert_eq!(changed, 1);
    }

    #[test]
    fn prop_winner_is_symmetric_under_mark_swap(board in board_strategy()) {
        let winner = TicTacToeRules::detect_winner(&board);
        let swapped = TicTacToeRules::detect_winner(&swap_marks(&board));
        prop_assert_eq!(swapped, winner.map(Mark::opposite));
    }

    #[test]
    fn prop_policy_picks_empty_cell(kind in policy_strategy(), moves in move_sequence_strategy()) {
        let session = replay(&moves);
        prop_assume!(!session.board.is_full());

        let policy = create_policy(kind);
        let choice = policy.choose_move(&session.board, session.next_turn).unwrap();
        prop_assert!(session.board.is_empty(choice));
        prop_assert_eq!(policy.choose_move(&session.board, session.next_turn).unwrap(), choice);
    }

    #[test]
    fn prop_ai_session_returns_to_human_turn(
        kind in policy_strategy(),
        moves in move_sequence_strategy(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let users = Arc::new(UserStore::new());
            let coordinator = SessionCoordinator::new(
                SessionStore::default(),
                NotificationHub::default(),
                Arc::from(create_policy(kind)),
                users,
            );
            let alice = ParticipantId::new("alice");
            let id = coordinator.start_session(&alice, OpponentChoice::Automated).unwrap();

            for position in moves {
                let result = coordinator
                    .submit_move(&alice, id, position.row() as i64, position.col() as i64)
                    .await
                    .unwrap();
                let next_turn = result.snapshot.next_turn;
                match result.status {
                    MoveStatus::Continue => prop_assert_eq!(next_turn, Some(Mark::X)),
                    MoveStatus::Won | MoveStatus::Draw => prop_assert_eq!(next_turn, None),
                    MoveStatus::Invalid => prop_assert!(result.automated_move.is_none()),
                }
            }

            let session = coordinator.store().get_session(id).await.unwrap();
            let (x_count, o_count) = session.board.count_marks();
            prop_assert!(x_count == o_count || x_count == o_count + 1);
            Ok(())
        })?;
    }
}

#[test]
fn test_minimax_never_loses_to_first_available() {
    let minimax = create_policy(PolicyKind::Minimax);
    let naive = create_policy(PolicyKind::FirstAvailable);

    // X: 単純方策、O: ミニマックス
    let mut session = Session::new(1, ParticipantId::new("alice"), Participant::Automated);
    while !session.is_finished() {
        let mark = session.next_turn;
        let policy = if mark == Mark::X { &naive } else { &minimax };
        let position = policy.choose_move(&session.board, mark).unwrap();
        let applied = TicTacToeRules::apply_move(&session.board, position, mark, session.next_turn);
        assert!(applied.accepted);
        session.record_move(position, mark, applied.board);
    }

    assert_ne!(session.winner(), Some(Mark::X));
}
