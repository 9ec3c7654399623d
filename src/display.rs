// Default mode graphics
pub const GFX_WIDTH: usize = 64;
pub const GFX_HEIGHT: usize = 32;

pub type Storage = u32;
const STORAGE_BITS: usize = Storage::BITS as usize;
const PACKED_WIDTH: usize = GFX_WIDTH / STORAGE_BITS;
pub const PACKED_LEN: usize = PACKED_WIDTH * GFX_HEIGHT;

struct Bounds {
    pub min: usize,
    pub max: usize,
}

impl Bounds {
    pub fn new(initial: usize) -> Self {
        Self {
            min: initial,
            max: initial,
        }
    }

    pub fn extend(&mut self, value: usize) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Range of packed words touched since the last call to
/// [`Framebuffer::pop_modifications`]. `offset` is in bytes.
pub struct ModificationData<'a> {
    pub offset: usize,
    pub data: &'a [Storage],
}

/// Monochrome pixel grid, row-major, packed MSB-first into `Storage` words.
pub struct Framebuffer {
    packed_state: [Storage; PACKED_LEN],
    was_modified: bool,
    modification: Bounds,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            packed_state: [0; PACKED_LEN],
            was_modified: false,
            modification: Bounds::new(0),
        }
    }

    pub fn width(&self) -> usize {
        GFX_WIDTH
    }

    pub fn height(&self) -> usize {
        GFX_HEIGHT
    }

    pub fn packed(&self) -> &[Storage] {
        &self.packed_state
    }

    pub fn pop_modifications(&mut self) -> Option<ModificationData> {
        let result = if self.was_modified {
            Some(ModificationData {
                offset: self.modification.min * std::mem::size_of::<Storage>(),
                data: &self.packed_state[self.modification.min..=self.modification.max],
            })
        } else {
            None
        };

        self.was_modified = false;
        result
    }

    pub fn clear(&mut self) {
        self.packed_state = [0; PACKED_LEN];
        self.extend_modification(0);
        self.extend_modification(PACKED_LEN - 1);
    }

    pub fn is_clear(&self) -> bool {
        self.packed_state.iter().all(|word| *word == 0)
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        let (col, bit) = get_bucket(x, y);
        self.packed_state[col] & (1 << bit) != 0
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        let (col, bit) = get_bucket(x, y);
        let mask = 1 << bit;
        if value {
            self.packed_state[col] |= mask;
        } else {
            self.packed_state[col] &= !mask;
        }
        self.extend_modification(col);
    }

    /// XORs an 8 pixel wide sprite onto the grid and reports whether any lit
    /// pixel got switched off. Only the origin wraps around the screen; the
    /// sprite itself is clipped at the right and bottom edges.
    pub fn draw_sprite(&mut self, x: u8, y: u8, rows: &[u8]) -> bool {
        let origin_x = x as usize % GFX_WIDTH;
        let origin_y = y as usize % GFX_HEIGHT;
        let mut collision = false;

        for (row_idx, row) in rows.iter().enumerate() {
            let py = origin_y + row_idx;
            if py >= GFX_HEIGHT {
                break;
            }
            for bit in 0..8 {
                let px = origin_x + bit;
                if px >= GFX_WIDTH {
                    break;
                }
                if (row >> (7 - bit)) & 1 == 0 {
                    continue;
                }
                let current = self.get(px, py);
                collision |= current;
                self.set(px, py, !current);
            }
        }

        collision
    }

    fn extend_modification(&mut self, col: usize) {
        if self.was_modified {
            self.modification.extend(col)
        } else {
            self.modification = Bounds::new(col);
            self.was_modified = true
        }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn get_bucket(x: usize, y: usize) -> (usize, usize) {
    let real_x = x / STORAGE_BITS;
    let col = y * PACKED_WIDTH + real_x;
    let bit = (STORAGE_BITS * (real_x + 1)) - x - 1;
    (col, bit)
}
