/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use newt::{perft, Position, FEN_KIWIPETE, FEN_STARTPOS};

fn test_perft_fen_nodes(depth: usize, fen: &str, expected: u64) {
    let mut position = Position::from_fen(fen).unwrap();
    let res = perft(&mut position, depth);
    assert_eq!(res, expected, "perft({depth}) failed on {fen}");
}

mod startpos_perft {
    use super::*;

    #[test]
    fn test_startpos_perft_1() {
        test_perft_fen_nodes(1, FEN_STARTPOS, 20);
    }

    #[test]
    fn test_startpos_perft_2() {
        test_perft_fen_nodes(2, FEN_STARTPOS, 400);
    }

    #[test]
    fn test_startpos_perft_3() {
        test_perft_fen_nodes(3, FEN_STARTPOS, 8_902);
    }

    #[test]
    fn test_startpos_perft_4() {
        test_perft_fen_nodes(4, FEN_STARTPOS, 197_281);
    }

    #[test]
    fn test_startpos_perft_5() {
        test_perft_fen_nodes(5, FEN_STARTPOS, 4_865_609);
    }
}

/// <https://www.chessprogramming.org/Perft_Results>
mod kiwipete_perft {
    use super::*;

    #[test]
    fn test_kiwipete_perft_1() {
        test_perft_fen_nodes(1, FEN_KIWIPETE, 48);
    }

    #[test]
    fn test_kiwipete_perft_2() {
        test_perft_fen_nodes(2, FEN_KIWIPETE, 2_039);
    }

    #[test]
    fn test_kiwipete_perft_3() {
        test_perft_fen_nodes(3, FEN_KIWIPETE, 97_862);
    }

    #[test]
    fn test_kiwipete_perft_4() {
        test_perft_fen_nodes(4, FEN_KIWIPETE, 4_085_603);
    }
}

/// Positions that stress en passant, promotions, pins, and castling.
/// <https://www.chessprogramming.net/perfect-perft/>
mod tricky_perft {
    use super::*;

    #[test]
    fn test_en_passant_discovered_check_perft() {
        test_perft_fen_nodes(5, "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 674_624);
    }

    #[test]
    fn test_promotion_heavy_perft() {
        test_perft_fen_nodes(4, "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1", 182_838);
    }

    #[test]
    fn test_mirrored_castling_perft() {
        test_perft_fen_nodes(
            4,
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            422_333,
        );
    }

    #[test]
    fn test_talkchess_illegal_ep_perft() {
        test_perft_fen_nodes(
            5,
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            2_103_487,
        );
    }

    #[test]
    fn test_steven_edwards_position_perft() {
        test_perft_fen_nodes(
            4,
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            3_894_594,
        );
    }
}
