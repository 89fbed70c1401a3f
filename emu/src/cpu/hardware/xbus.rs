//! # XBUS Expansion Bus
//!
//! Up to 15 devices (the CD drive being the usual one) hang off the
//! controller. The CPU talks to the selected device through four register
//! windows:
//!
//! | Window          | Read          | Write          |
//! |-----------------|---------------|----------------|
//! | 0x580 - 0x58F   | select        | select         |
//! | 0x590 - 0x59F   | poll          | poll           |
//! | 0x5A0 - 0x5AF   | status        | command byte   |
//! | 0x5B0 - 0x5BF   | data          | data byte      |
//!
//! A device requests the external interrupt when one of its poll ready bits
//! (3-0) is set together with the matching enable bit (7-4).

use tracing::{debug, info};

use crate::state::{StateError, StateReader, StateWriter};

pub const XBUS_SLOTS: usize = 15;

const STATE_MAGIC: &[u8; 4] = b"XBUS";
const STATE_VERSION: u8 = 1;

pub trait XbusDevice {
    fn init(&mut self) {}
    fn reset(&mut self);
    fn set_command(&mut self, command: u8);
    fn get_status(&mut self) -> u8;
    fn set_data(&mut self, data: u8);
    fn get_data(&mut self) -> u8;
    fn get_poll(&mut self) -> u8;
    fn set_poll(&mut self, poll: u8);

    fn save_size(&self) -> usize {
        0
    }

    fn save(&self, _out: &mut Vec<u8>) {}

    /// `data` is exactly `save_size()` bytes.
    fn restore(&mut self, _data: &[u8]) -> Result<(), StateError> {
        Ok(())
    }

    fn destroy(&mut self) {}
}

#[derive(Default)]
pub struct Xbus {
    slots: [Option<Box<dyn XbusDevice>>; XBUS_SLOTS],
    select: u32,
}

/// A validated XBUS blob, applied with [`Xbus::apply_state`].
pub struct XbusState {
    select: u32,
    slots: Vec<Option<Vec<u8>>>,
}

impl Xbus {
    /// Plugs `device` into the first free slot. `None` when all are taken.
    pub fn attach(&mut self, mut device: Box<dyn XbusDevice>) -> Option<usize> {
        let slot = self.slots.iter().position(Option::is_none)?;
        device.init();
        self.slots[slot] = Some(device);
        info!(slot, "XBUS device attached");
        Some(slot)
    }

    pub fn detach(&mut self, slot: usize) -> Option<Box<dyn XbusDevice>> {
        let mut device = self.slots.get_mut(slot)?.take()?;
        device.destroy();
        info!(slot, "XBUS device detached");
        Some(device)
    }

    pub fn reset(&mut self) {
        self.select = 0;
        for device in self.slots.iter_mut().flatten() {
            device.reset();
        }
    }

    #[must_use]
    pub const fn select(&self) -> u32 {
        self.select
    }

    fn selected(&mut self) -> Option<&mut Box<dyn XbusDevice>> {
        self.slots.get_mut(self.select as usize)?.as_mut()
    }

    /// Next byte of the selected device's data stream, 0 without a device.
    pub fn data(&mut self) -> u8 {
        self.selected().map_or(0, |device| device.get_data())
    }

    /// Register read, `offset` is relative to the controller base.
    pub fn read(&mut self, offset: u32) -> u32 {
        match offset & 0xFF0 {
            0x580 => self.select,
            0x590 => self.selected().map_or(0, |device| device.get_poll()).into(),
            0x5A0 => self.selected().map_or(0, |device| device.get_status()).into(),
            0x5B0 => self.data().into(),
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u32, value: u32) {
        let byte = value as u8;
        let select = self.select;
        match offset & 0xFF0 {
            0x580 => self.select = value & 0xF,
            0x590 => {
                if let Some(device) = self.selected() {
                    device.set_poll(byte);
                }
            }
            0x5A0 => match self.selected() {
                Some(device) => device.set_command(byte),
                None => debug!(select, byte, "XBUS command to empty slot"),
            },
            0x5B0 => {
                if let Some(device) = self.selected() {
                    device.set_data(byte);
                }
            }
            _ => {}
        }
    }

    /// Whether any device raises the external interrupt.
    pub fn external_interrupt_pending(&mut self) -> bool {
        self.slots.iter_mut().flatten().any(|device| {
            let poll = device.get_poll();
            (poll >> 4) & poll & 0xF != 0
        })
    }

    #[must_use]
    pub fn save_state(&self) -> Vec<u8> {
        let mut writer = StateWriter::new(STATE_MAGIC, STATE_VERSION);
        writer.u32(self.select);
        writer.u8(XBUS_SLOTS as u8);
        for slot in &self.slots {
            writer.bool(slot.is_some());
            if let Some(device) = slot {
                let mut data = Vec::with_capacity(device.save_size());
                device.save(&mut data);
                writer.chunk(&data);
            }
        }
        writer.finish()
    }

    /// Checks `blob` against the attached devices without changing anything.
    pub fn decode_state(&self, blob: &[u8]) -> Result<XbusState, StateError> {
        let mut reader = StateReader::new("XBUS", blob, STATE_MAGIC, STATE_VERSION)?;
        let select = reader.u32()?;
        let count = reader.u8()? as usize;
        if count != XBUS_SLOTS {
            return Err(reader.corrupt(format!("{count} slots")));
        }

        let mut slots = Vec::with_capacity(XBUS_SLOTS);
        for (slot, device) in self.slots.iter().enumerate() {
            let present = reader.bool()?;
            match (present, device) {
                (true, Some(device)) => {
                    slots.push(Some(reader.sized_chunk(device.save_size())?.to_vec()));
                }
                (false, None) => slots.push(None),
                _ => return Err(reader.corrupt(format!("slot {slot} attachment differs"))),
            }
        }
        reader.finish()?;
        Ok(XbusState { select, slots })
    }

    pub fn apply_state(&mut self, state: XbusState) -> Result<(), StateError> {
        self.select = state.select;
        for (device, data) in self.slots.iter_mut().zip(state.slots) {
            if let (Some(device), Some(data)) = (device, data) {
                device.restore(&data)?;
            }
        }
        Ok(())
    }

    pub fn restore_state(&mut self, blob: &[u8]) -> Result<(), StateError> {
        let state = self.decode_state(blob)?;
        self.apply_state(state)
    }
}

#[cfg(test)]
pub mod test_device {
    use std::collections::VecDeque;

    use super::XbusDevice;
    use crate::state::StateError;

    /// Replays a canned data stream and remembers what it was sent.
    #[derive(Default)]
    pub struct ScriptedDevice {
        pub stream: VecDeque<u8>,
        pub commands: Vec<u8>,
        pub poll: u8,
        pub status: u8,
    }

    impl ScriptedDevice {
        pub fn with_stream(bytes: &[u8]) -> Self {
            Self {
                stream: bytes.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl XbusDevice for ScriptedDevice {
        fn reset(&mut self) {
            self.commands.clear();
            self.poll = 0;
        }

        fn set_command(&mut self, command: u8) {
            self.commands.push(command);
        }

        fn get_status(&mut self) -> u8 {
            self.status
        }

        fn set_data(&mut self, data: u8) {
            self.stream.push_back(data);
        }

        fn get_data(&mut self) -> u8 {
            self.stream.pop_front().unwrap_or(0)
        }

        fn get_poll(&mut self) -> u8 {
            self.poll
        }

        fn set_poll(&mut self, poll: u8) {
            self.poll = poll;
        }

        fn save_size(&self) -> usize {
            2
        }

        fn save(&self, out: &mut Vec<u8>) {
            out.push(self.poll);
            out.push(self.status);
        }

        fn restore(&mut self, data: &[u8]) -> Result<(), StateError> {
            self.poll = data[0];
            self.status = data[1];
            Ok(())
        }
    }
}
