//! Построитель образов NVS для тестов: пишет страницы так же, как устройство.
#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};

use nvsdump::page::common::{
    CHUNK_ANY, ITEM_TYPE_BLOB_DATA, ITEM_TYPE_BLOB_IDX, ITEM_TYPE_SZ, ITEM_TYPE_U32, ITEM_TYPE_U8,
    PAGE_STATE_ACTIVE, PAGE_STATE_FULL,
};
use nvsdump::page::{
    item_header_crc32, item_record_crc32, nvs_crc32, page_header_crc32, ENTRY_DATA_OFFSET,
    ENTRY_SIZE, PAGE_SIZE,
};

pub const WRITTEN: u32 = 0b10;
pub const ERASED: u32 = 0b00;

/// Окно CRC заголовка item при записи.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrcWindow {
    /// [0..4) + [8..32) — как пишет прошивка.
    Full,
    /// [0..4) + [8..24).
    Narrow,
}

pub struct PageBuilder {
    pub buf: Vec<u8>,
    next_slot: usize,
    pub window: CrcWindow,
}

impl PageBuilder {
    pub fn new(seq: u32, version_byte: u8) -> Self {
        Self::with_state(seq, version_byte, PAGE_STATE_ACTIVE)
    }

    pub fn full(seq: u32, version_byte: u8) -> Self {
        Self::with_state(seq, version_byte, PAGE_STATE_FULL)
    }

    pub fn with_state(seq: u32, version_byte: u8, state: u32) -> Self {
        let mut buf = vec![0xFFu8; PAGE_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], state);
        LittleEndian::write_u32(&mut buf[4..8], seq);
        buf[8] = version_byte;
        let crc = page_header_crc32(&buf);
        LittleEndian::write_u32(&mut buf[28..32], crc);
        Self {
            buf,
            next_slot: 0,
            window: CrcWindow::Full,
        }
    }

    pub fn narrow_crc(mut self) -> Self {
        self.window = CrcWindow::Narrow;
        self
    }

    pub fn next_slot(&self) -> usize {
        self.next_slot
    }

    pub fn set_state(&mut self, slot: usize, bits: u32) {
        let off = 32 + (slot / 16) * 4;
        let shift = (slot % 16) * 2;
        let mut w = LittleEndian::read_u32(&self.buf[off..off + 4]);
        w = (w & !(0b11 << shift)) | ((bits & 0b11) << shift);
        LittleEndian::write_u32(&mut self.buf[off..off + 4], w);
    }

    fn slot_off(slot: usize) -> usize {
        ENTRY_DATA_OFFSET + slot * ENTRY_SIZE
    }

    /// Записать заголовок item + payload; вернуть слот заголовка.
    fn put(&mut self, ns: u8, ty: u8, chunk: u8, key: &str, data: [u8; 8], payload: &[u8]) -> usize {
        let slot = self.next_slot;
        let span = 1 + (payload.len() + ENTRY_SIZE - 1) / ENTRY_SIZE;
        let off = Self::slot_off(slot);
        {
            let item = &mut self.buf[off..off + ENTRY_SIZE];
            item.fill(0xFF);
            item[0] = ns;
            item[1] = ty;
            item[2] = span as u8;
            item[3] = chunk;
            let kb = key.as_bytes();
            let n = kb.len().min(15);
            item[8..8 + n].copy_from_slice(&kb[..n]);
            item[8 + n] = 0;
            item[24..32].copy_from_slice(&data);
            let crc = match self.window {
                CrcWindow::Full => item_record_crc32(item),
                CrcWindow::Narrow => item_header_crc32(item),
            };
            LittleEndian::write_u32(&mut item[4..8], crc);
        }
        for i in 0..span - 1 {
            let o = Self::slot_off(slot + 1 + i);
            let from = i * ENTRY_SIZE;
            let to = payload.len().min(from + ENTRY_SIZE);
            self.buf[o..o + ENTRY_SIZE].fill(0xFF);
            self.buf[o..o + (to - from)].copy_from_slice(&payload[from..to]);
        }
        for s in slot..slot + span {
            self.set_state(s, WRITTEN);
        }
        self.next_slot = slot + span;
        slot
    }

    pub fn namespace(&mut self, name: &str, id: u8) -> usize {
        self.u8(0, name, id)
    }

    pub fn u8(&mut self, ns: u8, key: &str, v: u8) -> usize {
        let mut data = [0xFFu8; 8];
        data[0] = v;
        self.put(ns, ITEM_TYPE_U8, CHUNK_ANY, key, data, &[])
    }

    pub fn u32(&mut self, ns: u8, key: &str, v: u32) -> usize {
        let mut data = [0xFFu8; 8];
        LittleEndian::write_u32(&mut data[0..4], v);
        self.put(ns, ITEM_TYPE_U32, CHUNK_ANY, key, data, &[])
    }

    pub fn raw(&mut self, ns: u8, ty: u8, key: &str, data: [u8; 8]) -> usize {
        self.put(ns, ty, CHUNK_ANY, key, data, &[])
    }

    pub fn string(&mut self, ns: u8, key: &str, text: &str) -> usize {
        self.string_bytes(ns, key, text.as_bytes())
    }

    /// SZ с произвольными байтами (в т.ч. не UTF-8); NUL добавляется.
    pub fn string_bytes(&mut self, ns: u8, key: &str, bytes: &[u8]) -> usize {
        let mut payload = bytes.to_vec();
        payload.push(0);
        let data = var_data(&payload);
        self.put(ns, ITEM_TYPE_SZ, CHUNK_ANY, key, data, &payload)
    }

    pub fn blob_chunk(&mut self, ns: u8, key: &str, chunk_index: u8, bytes: &[u8]) -> usize {
        let data = var_data(bytes);
        self.put(ns, ITEM_TYPE_BLOB_DATA, chunk_index, key, data, bytes)
    }

    pub fn blob_index(&mut self, ns: u8, key: &str, size: u32, count: u8, start: u8) -> usize {
        let mut data = [0xFFu8; 8];
        LittleEndian::write_u32(&mut data[0..4], size);
        data[4] = count;
        data[5] = start;
        self.put(ns, ITEM_TYPE_BLOB_IDX, CHUNK_ANY, key, data, &[])
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

fn var_data(payload: &[u8]) -> [u8; 8] {
    let mut data = [0xFFu8; 8];
    LittleEndian::write_u16(&mut data[0..2], payload.len() as u16);
    LittleEndian::write_u32(&mut data[4..8], nvs_crc32(payload));
    data
}

/// Заменить байт заголовка item и пересчитать его CRC (полное окно).
pub fn patch_header(page: &mut [u8], slot: usize, at: usize, value: u8) {
    let off = slot_offset(slot);
    page[off + at] = value;
    let crc = item_record_crc32(&page[off..off + ENTRY_SIZE]);
    LittleEndian::write_u32(&mut page[off + 4..off + 8], crc);
}

/// Offset заголовка слота внутри страницы.
pub fn slot_offset(slot: usize) -> usize {
    ENTRY_DATA_OFFSET + slot * ENTRY_SIZE
}

/// Склеить страницы в образ.
pub fn image(pages: Vec<Vec<u8>>) -> Vec<u8> {
    pages.concat()
}

/// Образ из сценария v1: ns "app"=1, u32 count=42, string greeting="hello".
pub fn build_v1() -> Vec<u8> {
    let mut p = PageBuilder::new(1, 0xFF);
    p.namespace("app", 1);
    p.u32(1, "count", 42);
    p.string(1, "greeting", "hello");
    p.finish()
}

/// Образ из сценария v2: ns "app"=1, string name="device", blob [0..9] одним чанком + индекс.
pub fn build_v2() -> Vec<u8> {
    let mut p = PageBuilder::new(1, 0xFE);
    p.namespace("app", 1);
    p.string(1, "name", "device");
    let data: Vec<u8> = (0u8..10).collect();
    p.blob_chunk(1, "blob", 0, &data);
    p.blob_index(1, "blob", data.len() as u32, 1, 0);
    p.finish()
}
