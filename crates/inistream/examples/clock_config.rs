//! Loads the settings of a network clock with a colour display from an INI
//! file, the way a small firmware would: every value lands directly in a
//! fixed-capacity field, nothing is allocated, and a few settings are
//! mandatory.
//!
//! ```text
//! [wifi]
//! ssid = 'home net'
//! password = "s3cret"
//!
//! [ntp]
//! server = pool.ntp.org
//! timeout = 1000     # ms
//!
//! [tft]
//! pass_color = 0x07FF  # RGB565, shown inside pass_from..pass_to
//! fail_color = 0xA082
//! pass_from = 07:30
//! pass_to = 19:30
//! backlight = 1      # index into the brightness table
//! ```
//!
//! After loading, a partial update (as a settings web page would post it) is
//! applied on top.
//!
//! Run with
//!
//! ```bash
//! cargo run -p inistream --example clock_config [path/to/clock.ini]
//! ```
#![allow(missing_docs)]

use std::{
    cell::{Cell, RefCell},
    env, fs,
    process::ExitCode,
};

use inistream::{InlineParser, ParserError, Phase, ValueContext};

const DEFAULT_CONFIG: &str = "\
[wifi]
ssid = 'home net'
password = \"s3cret\"

[ntp]
server = pool.ntp.org
timeout = 1000     # ms

[tft]
pass_color = 0x07FF
fail_color = 0xA082
pass_from = 07:30
pass_to = 19:30
backlight = 1
";

const BACKLIGHT_LEVELS: [u8; 7] = [0, 7, 15, 31, 63, 127, 255];

const SSID: u32 = 1 << 0;
const PASSWORD: u32 = 1 << 1;
const SERVER: u32 = 1 << 2;
const MANDATORY: u32 = SSID | PASSWORD | SERVER;

#[derive(Debug, Clone)]
struct Settings {
    ssid: RefCell<heapless::String<32>>,
    password: RefCell<heapless::String<64>>,
    ntp_server: RefCell<heapless::String<64>>,
    ntp_timeout: Cell<u32>,
    pass_color: Cell<u32>,
    fail_color: Cell<u32>,
    pass_from: RefCell<heapless::String<5>>,
    pass_to: RefCell<heapless::String<5>>,
    backlight: Cell<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ssid: RefCell::default(),
            password: RefCell::default(),
            ntp_server: RefCell::default(),
            ntp_timeout: Cell::new(1000),
            pass_color: Cell::new(0x07FF),
            fail_color: Cell::new(0xA082),
            pass_from: RefCell::new(heapless::String::try_from("07:30").unwrap_or_default()),
            pass_to: RefCell::new(heapless::String::try_from("19:30").unwrap_or_default()),
            backlight: Cell::new(1),
        }
    }
}

#[derive(Debug)]
enum LoadError {
    Parse(ParserError),
    Missing(u32),
}

impl From<ParserError> for LoadError {
    fn from(err: ParserError) -> Self {
        Self::Parse(err)
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Missing(bits) => {
                let names = [
                    (SSID, "wifi.ssid"),
                    (PASSWORD, "wifi.password"),
                    (SERVER, "ntp.server"),
                ];
                f.write_str("missing")?;
                for (_, name) in names.iter().filter(|(bit, _)| bits & bit != 0) {
                    write!(f, " {name}")?;
                }
                Ok(())
            }
        }
    }
}

fn is_time(text: &str) -> bool {
    match text.as_bytes() {
        &[h1, h2, b':', m1, m2] if [h1, h2, m1, m2].iter().all(u8::is_ascii_digit) => {
            (h1 - b'0') * 10 + (h2 - b'0') < 24 && m1 < b'6'
        }
        _ => false,
    }
}

fn is_host(text: &str) -> bool {
    let label_ok = |label: &str| {
        !label.is_empty() && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    };
    text.split('.').all(label_ok)
}

impl Settings {
    /// Claims the value under `ctx` and returns the bit it counts towards.
    fn claim<'t>(&'t self, ctx: &mut ValueContext<'_, 't>) -> u32 {
        match (ctx.group(), ctx.key()) {
            ("wifi", "ssid") => {
                ctx.map_str(&self.ssid);
                SSID
            }
            ("wifi", "password") => {
                ctx.map_str(&self.password);
                PASSWORD
            }
            ("ntp", "server") => {
                ctx.map_str(&self.ntp_server);
                SERVER
            }
            ("ntp", "timeout") => {
                ctx.map_u32(&self.ntp_timeout, 100..=10_000);
                0
            }
            ("tft", "pass_color") => {
                ctx.map_hex_u32(&self.pass_color, ..=0xFFFF);
                0
            }
            ("tft", "fail_color") => {
                ctx.map_hex_u32(&self.fail_color, ..=0xFFFF);
                0
            }
            ("tft", "pass_from") => {
                ctx.map_str(&self.pass_from);
                0
            }
            ("tft", "pass_to") => {
                ctx.map_str(&self.pass_to);
                0
            }
            ("tft", "backlight") => {
                ctx.map_u32(&self.backlight, ..BACKLIGHT_LEVELS.len() as u32);
                0
            }
            _ => 0,
        }
    }

    fn verify(&self, ctx: &ValueContext<'_, '_>) -> bool {
        match (ctx.group(), ctx.key()) {
            ("ntp", "server") => is_host(&self.ntp_server.borrow()),
            ("tft", "pass_from") => is_time(&self.pass_from.borrow()),
            ("tft", "pass_to") => is_time(&self.pass_to.borrow()),
            _ => true,
        }
    }

    /// Loads `text` and returns the mandatory bits it set.
    fn load(&self, text: &str) -> Result<u32, ParserError> {
        let seen = Cell::new(0);
        let mut parser = InlineParser::<16, 16>::with_verification(|ctx, phase| match phase {
            Phase::Claim => {
                seen.set(seen.get() | self.claim(ctx));
                true
            }
            Phase::Parsed => self.verify(ctx),
        });
        parser.parse_str(text)?;
        Ok(seen.get())
    }

    fn load_complete(&self, text: &str) -> Result<(), LoadError> {
        let missing = MANDATORY & !self.load(text)?;
        if missing == 0 {
            Ok(())
        } else {
            Err(LoadError::Missing(missing))
        }
    }

    /// Applies a partial update; on failure the settings stay as they were.
    fn update(&mut self, body: &str) -> Result<(), LoadError> {
        let scratch = self.clone();
        scratch.load(body)?;
        *self = scratch;
        Ok(())
    }

    fn print(&self) {
        let level = usize::try_from(self.backlight.get())
            .ok()
            .and_then(|index| BACKLIGHT_LEVELS.get(index))
            .copied()
            .unwrap_or_default();
        println!("wifi       {:?}", self.ssid.borrow().as_str());
        println!("ntp        {} ({} ms)", self.ntp_server.borrow(), self.ntp_timeout.get());
        println!(
            "colors     pass {:#06X} from {} to {}, fail {:#06X}",
            self.pass_color.get(),
            self.pass_from.borrow(),
            self.pass_to.borrow(),
            self.fail_color.get()
        );
        println!("backlight  index {} (pwm {level})", self.backlight.get());
    }
}

fn main() -> ExitCode {
    let text = match env::args().nth(1) {
        Some(path) => match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("{path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_CONFIG.to_owned(),
    };

    let mut settings = Settings::default();
    if let Err(err) = settings.load_complete(&text) {
        eprintln!("configuration rejected: {err}");
        return ExitCode::FAILURE;
    }
    settings.print();

    for body in ["[tft]\nbacklight = 4\npass_from = 08:00\n", "[tft]\npass_to = 25:00\n"] {
        println!();
        match settings.update(body) {
            Ok(()) => println!("update applied: {body:?}"),
            Err(err) => println!("update refused ({err}): {body:?}"),
        }
        settings.print();
    }
    ExitCode::SUCCESS
}
