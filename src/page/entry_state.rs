//! page/entry_state — таблица состояний слотов: 8 слов u32 LE, по 2 бита на слот.
//!
//! слово = slot / 16, сдвиг = (slot % 16) * 2, маска 0b11.

use byteorder::{ByteOrder, LittleEndian};

use super::common::{ENTRY_COUNT, ENTRY_TABLE_OFFSET, ENTRY_TABLE_WORDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// 0b11 — не записан.
    Empty,
    /// 0b10 — живые данные.
    Written,
    /// 0b00 — логически удалён.
    Erased,
    /// 0b01 — не определён форматом.
    Illegal,
}

impl EntryState {
    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b11 => EntryState::Empty,
            0b10 => EntryState::Written,
            0b00 => EntryState::Erased,
            _ => EntryState::Illegal,
        }
    }
}

/// Состояние слота по словам таблицы. Слот за пределами таблицы — Empty.
#[inline]
pub fn state_of(words: &[u32; ENTRY_TABLE_WORDS], slot: usize) -> EntryState {
    let word = slot / 16;
    if word >= ENTRY_TABLE_WORDS {
        return EntryState::Empty;
    }
    let shift = (slot % 16) * 2;
    EntryState::from_bits(words[word] >> shift)
}

/// Таблица состояний одной страницы.
#[derive(Debug, Clone)]
pub struct EntryStateTable {
    words: [u32; ENTRY_TABLE_WORDS],
}

impl EntryStateTable {
    /// Прочитать таблицу из страницы. Недостающие байты (обрезанная страница) читаются как 0xFF.
    pub fn read(page: &[u8]) -> Self {
        let mut raw = [0xFFu8; ENTRY_TABLE_WORDS * 4];
        if page.len() > ENTRY_TABLE_OFFSET {
            let avail = (page.len() - ENTRY_TABLE_OFFSET).min(raw.len());
            raw[..avail].copy_from_slice(&page[ENTRY_TABLE_OFFSET..ENTRY_TABLE_OFFSET + avail]);
        }
        let mut words = [0u32; ENTRY_TABLE_WORDS];
        LittleEndian::read_u32_into(&raw, &mut words);
        Self { words }
    }

    pub fn from_words(words: [u32; ENTRY_TABLE_WORDS]) -> Self {
        Self { words }
    }

    #[inline]
    pub fn state(&self, slot: usize) -> EntryState {
        state_of(&self.words, slot)
    }

    pub fn words(&self) -> &[u32; ENTRY_TABLE_WORDS] {
        &self.words
    }

    /// Счётчики (written, erased) по всем слотам страницы.
    pub fn counts(&self) -> (usize, usize) {
        let mut written = 0;
        let mut erased = 0;
        for slot in 0..ENTRY_COUNT {
            match self.state(slot) {
                EntryState::Written => written += 1,
                EntryState::Erased => erased += 1,
                _ => {}
            }
        }
        (written, erased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &mut [u32; ENTRY_TABLE_WORDS], slot: usize, bits: u32) {
        let w = slot / 16;
        let shift = (slot % 16) * 2;
        words[w] = (words[w] & !(0b11 << shift)) | ((bits & 0b11) << shift);
    }

    #[test]
    fn bit_extraction() {
        let mut words = [u32::MAX; ENTRY_TABLE_WORDS];
        set(&mut words, 0, 0b10);
        set(&mut words, 15, 0b00);
        set(&mut words, 16, 0b10);
        set(&mut words, 125, 0b01);

        let t = EntryStateTable::from_words(words);
        assert_eq!(t.state(0), EntryState::Written);
        assert_eq!(t.state(1), EntryState::Empty);
        assert_eq!(t.state(15), EntryState::Erased);
        assert_eq!(t.state(16), EntryState::Written);
        assert_eq!(t.state(125), EntryState::Illegal);
        assert_eq!(t.state(200), EntryState::Empty);
        assert_eq!(t.counts(), (2, 1));
    }

    #[test]
    fn read_from_page_bytes() {
        let mut page = vec![0xFFu8; 64];
        // слот 1 → Written: биты 2..4 слова 0 = 0b10
        page[32] = 0b1111_1011;
        let t = EntryStateTable::read(&page);
        assert_eq!(t.state(0), EntryState::Empty);
        assert_eq!(t.state(1), EntryState::Written);

        // обрезанная таблица — хвост считается Empty
        let t = EntryStateTable::read(&page[..34]);
        assert_eq!(t.state(1), EntryState::Written);
        assert_eq!(t.state(100), EntryState::Empty);
    }
}
