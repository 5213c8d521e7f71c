// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use crate::arch::{Address, Word, MEMORY_SIZE};

/// The flat LS-8 address space. Every [`Address`] is in range, so reads and
/// writes cannot fault.
#[derive(Clone)]
pub struct Memory {
    cells: [Word; MEMORY_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            cells: [0; MEMORY_SIZE],
        }
    }
}

impl Memory {
    pub fn read(&self, address: Address) -> Word {
        self.cells[address as usize]
    }

    pub fn write(&mut self, address: Address, value: Word) {
        self.cells[address as usize] = value;
    }

    /// Zeroes memory and copies `image` to the start of it. Returns `None`
    /// if `image` does not fit.
    pub fn load(&mut self, image: &[Word]) -> Option<()> {
        let destination = self.cells.get_mut(..image.len())?;
        destination.copy_from_slice(image);
        self.cells[image.len()..].fill(0);
        Some(())
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use crate::{arch::MEMORY_SIZE, memory::Memory};

    #[test]
    fn reads_back_writes() {
        let mut memory = Memory::default();
        memory.write(0, 1);
        memory.write(255, 2);
        assert_eq!(1, memory.read(0));
        assert_eq!(2, memory.read(255));
        assert_eq!(0, memory.read(128));
    }

    #[test]
    fn load_replaces_contents() {
        let mut memory = Memory::default();
        memory.write(10, 42);
        memory
            .load(&[1, 2, 3])
            .expect("a small image should fit");
        assert_eq!(&[1, 2, 3, 0], &memory.as_slice()[..4]);
        assert_eq!(0, memory.read(10));
    }

    #[test]
    fn load_rejects_oversized_images() {
        let mut memory = Memory::default();
        assert!(memory.load(&[0; MEMORY_SIZE]).is_some());
        assert!(memory.load(&[0; MEMORY_SIZE + 1]).is_none());
    }
}
