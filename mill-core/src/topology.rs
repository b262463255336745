//! Static board topology: slide adjacency and mill lines.
//!
//! Everything here is `const` data. The masks are derived from the neighbour
//! lists and mill triples at compile time, so a malformed table fails the
//! build instead of misbehaving at runtime.

/// Number of intersections on the board.
pub const POSITIONS: usize = 24;

/// Number of mill lines.
pub const MILL_COUNT: usize = 16;

/// Mask with one bit set for every intersection.
pub const BOARD_MASK: u32 = (1 << POSITIONS) - 1;

/// Slide neighbours of each position.
pub const NEIGHBORS: [&[u8]; POSITIONS] = [
    &[1, 9],           // 0
    &[0, 2, 4],        // 1
    &[1, 14],          // 2
    &[4, 10],          // 3
    &[1, 3, 5, 7],     // 4
    &[4, 13],          // 5
    &[7, 11],          // 6
    &[4, 6, 8],        // 7
    &[7, 12],          // 8
    &[0, 10, 21],      // 9
    &[3, 9, 11, 18],   // 10
    &[6, 10, 15],      // 11
    &[8, 13, 17],      // 12
    &[5, 12, 14, 20],  // 13
    &[2, 13, 23],      // 14
    &[11, 16],         // 15
    &[15, 17, 19],     // 16
    &[12, 16],         // 17
    &[10, 19],         // 18
    &[16, 18, 20, 22], // 19
    &[13, 19],         // 20
    &[9, 22],          // 21
    &[19, 21, 23],     // 22
    &[14, 22],         // 23
];

/// The 16 mill lines: 8 horizontal, then 8 vertical.
pub const MILLS: [[u8; 3]; MILL_COUNT] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [9, 10, 11],
    [12, 13, 14],
    [15, 16, 17],
    [18, 19, 20],
    [21, 22, 23],
    [0, 9, 21],
    [3, 10, 18],
    [6, 11, 15],
    [1, 4, 7],
    [16, 19, 22],
    [8, 12, 17],
    [5, 13, 20],
    [2, 14, 23],
];

/// Neighbour set of each position as a bitmask.
pub const ADJACENT_MASKS: [u32; POSITIONS] = adjacent_masks();

/// Each mill line as a bitmask.
pub const MILL_MASKS: [u32; MILL_COUNT] = mill_masks();

/// Indices into `MILLS` of the two lines through each position.
pub const MILLS_OF: [[usize; 2]; POSITIONS] = mills_of();

/// Single-bit mask for a position index.
#[inline]
pub const fn bit(index: usize) -> u32 {
    1 << index
}

const fn adjacent_masks() -> [u32; POSITIONS] {
    let mut masks = [0u32; POSITIONS];
    let mut pos = 0;
    while pos < POSITIONS {
        let neighbors = NEIGHBORS[pos];
        let mut i = 0;
        while i < neighbors.len() {
            masks[pos] |= bit(neighbors[i] as usize);
            i += 1;
        }
        pos += 1;
    }
    masks
}

const fn mill_masks() -> [u32; MILL_COUNT] {
    let mut masks = [0u32; MILL_COUNT];
    let mut m = 0;
    while m < MILL_COUNT {
        let line = MILLS[m];
        masks[m] = bit(line[0] as usize) | bit(line[1] as usize) | bit(line[2] as usize);
        m += 1;
    }
    masks
}

// Panics during constant evaluation unless every position lies on exactly two lines.
const fn mills_of() -> [[usize; 2]; POSITIONS] {
    let masks = mill_masks();
    let mut table = [[0usize; 2]; POSITIONS];
    let mut pos = 0;
    while pos < POSITIONS {
        let mut found = 0;
        let mut m = 0;
        while m < MILL_COUNT {
            if masks[m] & bit(pos) != 0 {
                if found == 2 {
                    panic!("position lies on more than two mill lines");
                }
                table[pos][found] = m;
                found += 1;
            }
            m += 1;
        }
        if found != 2 {
            panic!("position lies on fewer than two mill lines");
        }
        pos += 1;
    }
    table
}
