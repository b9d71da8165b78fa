//! LZSS codec used by Amusement Vision `.lz` files.
//!
//! A classic 4 KiB sliding-window LZ77 variant. The compressed stream is a
//! sequence of blocks, each one control byte followed by up to eight units:
//!
//! ```text
//! control byte   bit n (LSB first) describes unit n
//!   1 -> literal  : 1 byte, copied verbatim
//!   0 -> match    : 2 bytes  [pppppppp] [PPPPllll]
//!                   position = pppppppp | PPPP << 8   (ring-buffer index)
//!                   length   = llll + 3               (3..=18)
//! ```
//!
//! Positions are absolute indices into a 4096-byte ring buffer whose first
//! `4096 - 18` bytes start out as `0x00` and whose write cursor starts at
//! `4096 - 18`. Matches are replayed byte by byte, so a match may overlap the
//! bytes it is producing.
//!
//! The encoder finds matches with one binary search tree per leading byte,
//! keyed on the 18-byte string at each window position. Output is a pure
//! function of the input.

use tracing::trace;

use crate::{Error, Result};

/// Ring buffer size (`N`).
pub const WINDOW_SIZE: usize = 4096;
/// Longest match that can be encoded (`F`).
pub const MAX_MATCH: usize = 18;
/// Shortest match worth encoding; shorter runs are sent as literals.
pub const MIN_MATCH: usize = 3;
/// Initial content of the ring buffer.
pub const FILL_BYTE: u8 = 0x00;

/// "No node" marker in the tree arena; also the first tree-root slot minus one.
const NIL: usize = WINDOW_SIZE;
/// Arena size: `N` window nodes, `NIL`, and 256 tree roots.
const ARENA: usize = WINDOW_SIZE + 257;

/// One decoded unit of an LZSS stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A byte copied verbatim.
    Literal(u8),
    /// Copy `length` bytes from the ring buffer starting at `position`.
    Match { position: u16, length: u8 },
}

/// Iterator over the [`Token`]s of a compressed stream.
///
/// Yields [`Error::UnexpectedEof`] once and stops if the stream ends in the
/// middle of a unit.
pub struct Tokens<'a> {
    input: &'a [u8],
    pos: usize,
    /// Control bits in the low byte; the sentinel bit marks when a reload is
    /// due.
    flags: u16,
    failed: bool,
}

impl<'a> Tokens<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            flags: 0,
            failed: false,
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    fn unit(&mut self) -> Option<Token> {
        if self.flags & 0xFF00 == 0 {
            self.flags = u16::from(self.next_byte()?) | 0x8000;
        }
        let literal = self.flags & 1 == 1;
        self.flags >>= 1;

        if literal {
            return self.next_byte().map(Token::Literal);
        }
        let lo = self.next_byte()?;
        let hi = self.next_byte()?;
        Some(Token::Match {
            position: u16::from(lo) | (u16::from(hi & 0xF0) << 4),
            length: (hi & 0x0F) + MIN_MATCH as u8,
        })
    }
}

impl Iterator for Tokens<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.input.len() {
            return None;
        }
        match self.unit() {
            Some(t) => Some(Ok(t)),
            None => {
                self.failed = true;
                Some(Err(Error::UnexpectedEof))
            }
        }
    }
}

/// Decompress a complete LZSS stream.
///
/// The caller is responsible for checking the result against any declared
/// length. Returns [`Error::UnexpectedEof`] if the stream is truncated inside
/// a unit.
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 2);
    let mut ring = [FILL_BYTE; WINDOW_SIZE];
    let mut cursor = WINDOW_SIZE - MAX_MATCH;

    for token in Tokens::new(input) {
        match token? {
            Token::Literal(c) => {
                out.push(c);
                ring[cursor] = c;
                cursor = (cursor + 1) % WINDOW_SIZE;
            }
            Token::Match { position, length } => {
                let position = position as usize;
                for i in 0..length as usize {
                    let c = ring[(position + i) % WINDOW_SIZE];
                    out.push(c);
                    ring[cursor] = c;
                    cursor = (cursor + 1) % WINDOW_SIZE;
                }
            }
        }
    }

    trace!(input = input.len(), output = out.len(), "lzss decode");
    Ok(out)
}

/// Compress `input`. An empty input produces an empty output.
pub fn encode(input: &[u8]) -> Vec<u8> {
    let out = Encoder::new().encode(input);
    trace!(input = input.len(), output = out.len(), "lzss encode");
    out
}

/// Working state for one compression run.
///
/// Nodes are addressed by ring-buffer position. Slots `N + 1 + c` in `right`
/// are the roots of the 256 trees, one per leading byte `c`.
struct Encoder {
    /// Ring buffer plus `F - 1` bytes mirroring its start, so string
    /// comparisons never wrap.
    ring: Vec<u8>,
    left: Vec<usize>,
    right: Vec<usize>,
    parent: Vec<usize>,
    /// Longest match found by the last `insert_node`.
    match_position: usize,
    match_length: usize,
}

impl Encoder {
    fn new() -> Self {
        Self {
            ring: vec![FILL_BYTE; WINDOW_SIZE + MAX_MATCH - 1],
            left: vec![NIL; ARENA],
            right: vec![NIL; ARENA],
            parent: vec![NIL; ARENA],
            match_position: 0,
            match_length: 0,
        }
    }

    /// Insert the string `ring[r..r + F]` into its tree and record the longest
    /// match against strings already there.
    ///
    /// A node that matches for the full `F` bytes is replaced by `r`, since
    /// the older one leaves the window first.
    fn insert_node(&mut self, r: usize) {
        let mut cmp: i32 = 1;
        let mut p = NIL + 1 + self.ring[r] as usize;
        self.left[r] = NIL;
        self.right[r] = NIL;
        self.match_length = 0;

        loop {
            if cmp >= 0 {
                if self.right[p] == NIL {
                    self.right[p] = r;
                    self.parent[r] = p;
                    return;
                }
                p = self.right[p];
            } else {
                if self.left[p] == NIL {
                    self.left[p] = r;
                    self.parent[r] = p;
                    return;
                }
                p = self.left[p];
            }

            let mut i = 1;
            while i < MAX_MATCH {
                cmp = i32::from(self.ring[r + i]) - i32::from(self.ring[p + i]);
                if cmp != 0 {
                    break;
                }
                i += 1;
            }
            if i > self.match_length {
                self.match_position = p;
                self.match_length = i;
                if i >= MAX_MATCH {
                    break;
                }
            }
        }

        // Full-length match: `r` takes over `p`'s place in the tree.
        let (pl, pr, pp) = (self.left[p], self.right[p], self.parent[p]);
        self.parent[r] = pp;
        self.left[r] = pl;
        self.right[r] = pr;
        self.parent[pl] = r;
        self.parent[pr] = r;
        if self.right[pp] == p {
            self.right[pp] = r;
        } else {
            self.left[pp] = r;
        }
        self.parent[p] = NIL;
    }

    /// Remove node `p` from its tree, if present.
    fn delete_node(&mut self, p: usize) {
        if self.parent[p] == NIL {
            return;
        }

        let q = if self.right[p] == NIL {
            self.left[p]
        } else if self.left[p] == NIL {
            self.right[p]
        } else {
            // Promote the in-order predecessor.
            let mut q = self.left[p];
            if self.right[q] != NIL {
                while self.right[q] != NIL {
                    q = self.right[q];
                }
                let (qp, ql) = (self.parent[q], self.left[q]);
                self.right[qp] = ql;
                self.parent[ql] = qp;
                self.left[q] = self.left[p];
                self.parent[self.left[p]] = q;
            }
            self.right[q] = self.right[p];
            self.parent[self.right[p]] = q;
            q
        };

        let pp = self.parent[p];
        self.parent[q] = pp;
        if self.right[pp] == p {
            self.right[pp] = q;
        } else {
            self.left[pp] = q;
        }
        self.parent[p] = NIL;
    }

    fn encode(&mut self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len() / 2 + 17);
        let mut input = input.iter().copied();

        // code[0] holds the flags, code[1..] up to eight units.
        let mut code = [0u8; 1 + 2 * 8];
        let mut code_len = 1;
        let mut mask: u8 = 1;

        let mut s = 0;
        let mut r = WINDOW_SIZE - MAX_MATCH;

        // Fill the lookahead.
        let mut len = 0;
        while len < MAX_MATCH {
            let Some(c) = input.next() else { break };
            self.ring[r + len] = c;
            len += 1;
        }
        if len == 0 {
            return out;
        }

        // Seed the trees with the fill-byte strings ending just before `r`.
        for i in 1..=MAX_MATCH {
            self.insert_node(r - i);
        }
        self.insert_node(r);

        loop {
            // Near the end of input the match can run past the data.
            self.match_length = self.match_length.min(len);

            if self.match_length < MIN_MATCH {
                self.match_length = 1;
                code[0] |= mask;
                code[code_len] = self.ring[r];
                code_len += 1;
            } else {
                code[code_len] = self.match_position as u8;
                code[code_len + 1] = (((self.match_position >> 4) & 0xF0)
                    | (self.match_length - MIN_MATCH)) as u8;
                code_len += 2;
            }

            mask <<= 1;
            if mask == 0 {
                out.extend_from_slice(&code[..code_len]);
                code[0] = 0;
                code_len = 1;
                mask = 1;
            }

            let advance = self.match_length;
            let mut i = 0;
            while i < advance {
                let Some(c) = input.next() else { break };
                self.delete_node(s);
                self.ring[s] = c;
                if s < MAX_MATCH - 1 {
                    self.ring[s + WINDOW_SIZE] = c;
                }
                s = (s + 1) % WINDOW_SIZE;
                r = (r + 1) % WINDOW_SIZE;
                self.insert_node(r);
                i += 1;
            }

            // Input exhausted: keep sliding while the lookahead drains.
            while i < advance {
                i += 1;
                self.delete_node(s);
                s = (s + 1) % WINDOW_SIZE;
                r = (r + 1) % WINDOW_SIZE;
                len -= 1;
                if len != 0 {
                    self.insert_node(r);
                }
            }

            if len == 0 {
                break;
            }
        }

        if code_len > 1 {
            out.extend_from_slice(&code[..code_len]);
        }
        out
    }
}
