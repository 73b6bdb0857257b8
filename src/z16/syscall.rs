use std::collections::VecDeque;

use tracing::{debug, info};

use crate::z16::arch::{A0, A1, MEMORY_SIZE};
use crate::z16::memory::{Bus, DataMemory};
use crate::z16::registers::Registers;

/// Services selected by the 10-bit `ECALL` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    ReadString,
    ReadInteger,
    PrintString,
    PlayTone,
    SetAudioVolume,
    StopAudio,
    ReadKeyboard,
    RegistersDump,
    MemoryDump,
    ProgramExit,
}

impl Service {
    pub fn from_code(code: u16) -> Option<Service> {
        use Service::*;
        Some(match code {
            1 => ReadString,
            2 => ReadInteger,
            3 => PrintString,
            4 => PlayTone,
            5 => SetAudioVolume,
            6 => StopAudio,
            7 => ReadKeyboard,
            8 => RegistersDump,
            9 => MemoryDump,
            10 => ProgramExit,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        use Service::*;
        match self {
            ReadString => 1,
            ReadInteger => 2,
            PrintString => 3,
            PlayTone => 4,
            SetAudioVolume => 5,
            StopAudio => 6,
            ReadKeyboard => 7,
            RegistersDump => 8,
            MemoryDump => 9,
            ProgramExit => 10,
        }
    }

    pub fn name(self) -> &'static str {
        use Service::*;
        match self {
            ReadString => "Read String",
            ReadInteger => "Read Integer",
            PrintString => "Print String",
            PlayTone => "Play Tone",
            SetAudioVolume => "Set Audio Volume",
            StopAudio => "Stop Audio",
            ReadKeyboard => "Read Keyboard",
            RegistersDump => "Registers Dump",
            MemoryDump => "Memory Dump",
            ProgramExit => "Program Exit",
        }
    }
}

/// What a host may touch while serving a call.
pub struct SyscallContext<'a> {
    pub regs: &'a mut Registers,
    pub mem: &'a mut DataMemory,
}

/// Peripheral side of `ECALL`. Every service defaults to a no-op; program
/// exit never reaches the host.
pub trait SyscallHost: Send {
    fn read_string(&mut self, _ctx: &mut SyscallContext<'_>) {}
    fn read_integer(&mut self, _ctx: &mut SyscallContext<'_>) {}
    fn print_string(&mut self, _ctx: &mut SyscallContext<'_>) {}
    fn play_tone(&mut self, _ctx: &mut SyscallContext<'_>) {}
    fn set_audio_volume(&mut self, _ctx: &mut SyscallContext<'_>) {}
    fn stop_audio(&mut self, _ctx: &mut SyscallContext<'_>) {}
    fn read_keyboard(&mut self, _ctx: &mut SyscallContext<'_>) {}
    fn registers_dump(&mut self, _ctx: &mut SyscallContext<'_>) {}
    fn memory_dump(&mut self, _ctx: &mut SyscallContext<'_>) {}
}

/// Routes `service` to the matching host method.
pub fn dispatch<H: SyscallHost + ?Sized>(host: &mut H, service: Service, ctx: &mut SyscallContext<'_>) {
    match service {
        Service::ReadString => host.read_string(ctx),
        Service::ReadInteger => host.read_integer(ctx),
        Service::PrintString => host.print_string(ctx),
        Service::PlayTone => host.play_tone(ctx),
        Service::SetAudioVolume => host.set_audio_volume(ctx),
        Service::StopAudio => host.stop_audio(ctx),
        Service::ReadKeyboard => host.read_keyboard(ctx),
        Service::RegistersDump => host.registers_dump(ctx),
        Service::MemoryDump => host.memory_dump(ctx),
        Service::ProgramExit => {}
    }
}

/// Host that ignores every service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl SyscallHost for NullHost {}

/// Line-oriented console: queued input, captured output.
#[derive(Debug, Default, Clone)]
pub struct ConsoleHost {
    lines: VecDeque<String>,
    keys: VecDeque<u8>,
    output: String,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { lines: lines.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
    }

    pub fn push_keys(&mut self, keys: &[u8]) {
        self.keys.extend(keys);
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    fn next_line(&mut self) -> String {
        self.lines.pop_front().unwrap_or_default()
    }
}

impl SyscallHost for ConsoleHost {
    /// Writes the next line at `a0`, NUL-terminated, using at most `a1`
    /// bytes. `a0` receives the number of characters stored.
    fn read_string(&mut self, ctx: &mut SyscallContext<'_>) {
        let line = self.next_line();
        let addr = ctx.regs.read(A0);
        let cap = ctx.regs.read(A1) as usize;
        if cap == 0 {
            ctx.regs.write(A0, 0);
            return;
        }
        let n = line.len().min(cap - 1);
        for (i, &b) in line.as_bytes()[..n].iter().enumerate() {
            ctx.mem.store8(addr.wrapping_add(i as u16), b);
        }
        ctx.mem.store8(addr.wrapping_add(n as u16), 0);
        ctx.regs.write(A0, n as u16);
    }

    fn read_integer(&mut self, ctx: &mut SyscallContext<'_>) {
        let line = self.next_line();
        let value = line.trim().parse::<i32>().unwrap_or_else(|e| {
            debug!("read integer: {line:?} is not a number ({e})");
            0
        });
        ctx.regs.write(A0, value as u16);
    }

    fn print_string(&mut self, ctx: &mut SyscallContext<'_>) {
        let mut addr = ctx.regs.read(A0);
        let mut bytes = Vec::new();
        while bytes.len() < MEMORY_SIZE {
            let b = ctx.mem.load8(addr);
            if b == 0 {
                break;
            }
            bytes.push(b);
            addr = addr.wrapping_add(1);
        }
        self.output.push_str(&String::from_utf8_lossy(&bytes));
    }

    fn play_tone(&mut self, ctx: &mut SyscallContext<'_>) {
        info!("play tone: frequency {} duration {}", ctx.regs.read(A0), ctx.regs.read(A1));
    }

    fn set_audio_volume(&mut self, ctx: &mut SyscallContext<'_>) {
        info!("set audio volume: {}", ctx.regs.read(A0));
    }

    fn stop_audio(&mut self, _ctx: &mut SyscallContext<'_>) {
        info!("stop audio");
    }

    fn read_keyboard(&mut self, ctx: &mut SyscallContext<'_>) {
        let key = self.keys.pop_front().unwrap_or(0);
        ctx.regs.write(A0, key as u16);
    }

    fn registers_dump(&mut self, ctx: &mut SyscallContext<'_>) {
        for line in ctx.regs.dump() {
            self.output.push_str(&line);
            self.output.push('\n');
        }
    }

    fn memory_dump(&mut self, ctx: &mut SyscallContext<'_>) {
        let start = ctx.regs.read(A0);
        let len = ctx.regs.read(A1) as usize;
        for row in (0..len).step_by(16) {
            let base = start.wrapping_add(row as u16);
            let cells = (0..16.min(len - row))
                .map(|i| format!("{:02X}", ctx.mem.load8(base.wrapping_add(i as u16))))
                .collect::<Vec<_>>()
                .join(" ");
            self.output.push_str(&format!("0x{base:04X}: {cells}\n"));
        }
    }
}
