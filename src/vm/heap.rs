//! Heap storage for the machine
//!
//! - [`Heap`]: blocks of cells created by `allocn`, addressed by block and
//!   cell offset. Blocks are never freed.
//! - [`StringHeap`]: every distinct string the program creates (`pushs`,
//!   `read`, `chr`, `setcharat`), addressed by [`StrRef`]. Equal text shares
//!   one entry, so a loop that keeps rebuilding the same strings does not grow
//!   the heap.
//!
//! Both are bounded so a runaway program fails instead of exhausting memory.

use super::value::{StrRef, Value};
use rustc_hash::FxHashMap;

/// Default cell limit for [`Heap`]
pub const DEFAULT_MAX_CELLS: usize = 1 << 24;

/// Default string count limit for [`StringHeap`]
pub const DEFAULT_MAX_STRINGS: usize = 1 << 22;

#[derive(Debug, Clone)]
pub struct Heap {
    blocks: Vec<Vec<Value>>,
    total_cells: usize,
    max_cells: usize,
}

impl Heap {
    pub fn new(max_cells: usize) -> Self {
        Heap {
            blocks: Vec::new(),
            total_cells: 0,
            max_cells,
        }
    }

    /// Allocate a zero-filled block and return its index.
    ///
    /// `Err` carries the cell count that could not be satisfied.
    pub fn allocate(&mut self, cells: usize) -> Result<usize, usize> {
        if self.total_cells.saturating_add(cells) > self.max_cells {
            return Err(cells);
        }
        self.blocks.push(vec![Value::Int(0); cells]);
        self.total_cells += cells;
        Ok(self.blocks.len() - 1)
    }

    fn cell_index(&self, block: usize, offset: i64) -> Option<usize> {
        let cells = self.blocks.get(block)?;
        let index = usize::try_from(offset).ok()?;
        (index < cells.len()).then_some(index)
    }

    pub fn load(&self, block: usize, offset: i64) -> Option<Value> {
        let index = self.cell_index(block, offset)?;
        Some(self.blocks[block][index])
    }

    /// Store into a cell; `None` if the cell does not exist
    pub fn store(&mut self, block: usize, offset: i64, value: Value) -> Option<()> {
        let index = self.cell_index(block, offset)?;
        self.blocks[block][index] = value;
        Some(())
    }

    pub fn block_len(&self, block: usize) -> usize {
        self.blocks.get(block).map_or(0, Vec::len)
    }

    pub fn total_cells(&self) -> usize {
        self.total_cells
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CELLS)
    }
}

#[derive(Debug, Clone)]
pub struct StringHeap {
    strings: Vec<String>,
    index: FxHashMap<String, StrRef>,
    max_strings: usize,
}

impl StringHeap {
    pub fn new(max_strings: usize) -> Self {
        StringHeap {
            strings: Vec::new(),
            index: FxHashMap::default(),
            max_strings,
        }
    }

    /// Store a string, reusing the entry of an equal one.
    ///
    /// `None` when the text is new and the heap is full.
    pub fn intern(&mut self, text: String) -> Option<StrRef> {
        if let Some(&existing) = self.index.get(&text) {
            return Some(existing);
        }
        if self.strings.len() >= self.max_strings {
            return None;
        }
        let r = self.strings.len();
        self.index.insert(text.clone(), r);
        self.strings.push(text);
        Some(r)
    }

    pub fn get(&self, r: StrRef) -> Option<&str> {
        self.strings.get(r).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringHeap {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STRINGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_access() {
        let mut heap = Heap::default();
        let a = heap.allocate(3).unwrap();
        let b = heap.allocate(2).unwrap();

        assert_ne!(a, b);
        assert_eq!(heap.load(a, 2), Some(Value::Int(0)));
        assert_eq!(heap.store(b, 1, Value::Float(1.5)), Some(()));
        assert_eq!(heap.load(b, 1), Some(Value::Float(1.5)));
        assert_eq!(heap.total_cells(), 5);
    }

    #[test]
    fn test_out_of_range_cells() {
        let mut heap = Heap::default();
        let a = heap.allocate(2).unwrap();

        assert_eq!(heap.load(a, 2), None);
        assert_eq!(heap.load(a, -1), None);
        assert_eq!(heap.store(a + 1, 0, Value::Int(1)), None);
    }

    #[test]
    fn test_heap_limit() {
        let mut heap = Heap::new(4);
        assert!(heap.allocate(3).is_ok());
        assert_eq!(heap.allocate(2), Err(2));
    }

    #[test]
    fn test_string_heap() {
        let mut strings = StringHeap::new(2);
        let hello = strings.intern("hello".to_string()).unwrap();
        strings.intern(String::new()).unwrap();

        assert_eq!(strings.get(hello), Some("hello"));
        assert_eq!(strings.intern("full".to_string()), None);
        assert_eq!(strings.len(), 2);
    }

    #[test]
    fn test_equal_strings_share_an_entry() {
        let mut strings = StringHeap::new(2);
        let first = strings.intern("x".to_string()).unwrap();
        for _ in 0..1000 {
            assert_eq!(strings.intern("x".to_string()), Some(first));
        }
        let other = strings.intern("y".to_string()).unwrap();

        assert_ne!(first, other);
        assert_eq!(strings.len(), 2);
        assert_eq!(strings.intern("x".to_string()), Some(first));
    }
}
