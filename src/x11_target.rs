//! X11 presentation control.
//!
//! Commands are delivered as synthetic key press/release pairs through the
//! XTEST extension to whichever window has focus. The slide show counts as
//! running when the root window advertises an active window and, if a title
//! filter is configured, that window's title contains it.

use crate::{
    config::PresentationConfig,
    error::{Error, Result},
    presentation_control::PresentationTarget,
};
use log::{debug, info};
use x11rb::{
    connection::{Connection, RequestConnection},
    protocol::{
        xproto::{self, Atom, AtomEnum, ConnectionExt, Keycode, Window},
        xtest::{self, ConnectionExt as _},
    },
    rust_connection::RustConnection,
};

/// Keysym for a key name as used in the configuration, e.g. `Right`, `Page_Down`, `n`
#[must_use]
pub fn keysym_from_name(name: &str) -> Option<u32> {
    const NAMED: [(&str, u32); 17] = [
        ("Right", 0xff53),
        ("Left", 0xff51),
        ("Up", 0xff52),
        ("Down", 0xff54),
        ("Next", 0xff56),
        ("Page_Down", 0xff56),
        ("Prior", 0xff55),
        ("Page_Up", 0xff55),
        ("Home", 0xff50),
        ("End", 0xff57),
        ("Escape", 0xff1b),
        ("Return", 0xff0d),
        ("BackSpace", 0xff08),
        ("space", 0x0020),
        ("Tab", 0xff09),
        ("F5", 0xffc2),
        ("Delete", 0xffff),
    ];

    let name = name.trim();
    if let Some(&(_, keysym)) = NAMED.iter().find(|(known, _)| known.eq_ignore_ascii_case(name)) {
        return Some(keysym);
    }

    // Latin-1 keysyms equal their character codes
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(u32::from(c.to_ascii_lowercase())),
        _ => None,
    }
}

/// Slide show control through synthetic X11 key events
pub struct X11PresentationTarget {
    connection: RustConnection,
    root: Window,
    active_window_atom: Atom,
    wm_name_atom: Atom,
    utf8_string_atom: Atom,
    window_title: Option<String>,
    next_key: Keycode,
    previous_key: Keycode,
    exit_key: Keycode,
}

impl X11PresentationTarget {
    /// Connect to the display and resolve the configured keys
    pub fn new(config: &PresentationConfig) -> Result<Self> {
        info!("Initializing X11 presentation control");

        let (connection, screen_num) = RustConnection::connect(None)
            .map_err(|e| Error::PresentationControl(format!("Failed to connect to X11: {e}")))?;

        let root = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| Error::PresentationControl("Failed to get screen".to_string()))?
            .root;

        let xtest_available = connection
            .extension_information(xtest::X11_EXTENSION_NAME)
            .map_err(|e| Error::PresentationControl(format!("Failed to query XTEST: {e}")))?
            .is_some();
        if !xtest_available {
            return Err(Error::PresentationControl(
                "X server does not support the XTEST extension".to_string(),
            ));
        }

        let active_window_atom = intern(&connection, b"_NET_ACTIVE_WINDOW")?;
        let wm_name_atom = intern(&connection, b"_NET_WM_NAME")?;
        let utf8_string_atom = intern(&connection, b"UTF8_STRING")?;

        let keys = &config.keys;
        let next_key = resolve_keycode(&connection, &keys.next)?;
        let previous_key = resolve_keycode(&connection, &keys.previous)?;
        let exit_key = resolve_keycode(&connection, &keys.exit)?;

        info!(
            "X11 presentation control ready: next={} previous={} exit={}{}",
            keys.next,
            keys.previous,
            keys.exit,
            config
                .window_title
                .as_ref()
                .map_or_else(String::new, |title| format!(", window title filter \"{title}\""))
        );

        Ok(Self {
            connection,
            root,
            active_window_atom,
            wm_name_atom,
            utf8_string_atom,
            window_title: config.window_title.clone(),
            next_key,
            previous_key,
            exit_key,
        })
    }

    fn tap(&self, keycode: Keycode) -> Result<()> {
        debug!("Sending keycode {}", keycode);

        for event in [xproto::KEY_PRESS_EVENT, xproto::KEY_RELEASE_EVENT] {
            self.connection
                .xtest_fake_input(event, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
                .map_err(|e| Error::PresentationControl(format!("Failed to send key event: {e}")))?;
        }

        self.connection
            .flush()
            .map_err(|e| Error::PresentationControl(format!("Failed to flush connection: {e}")))?;

        Ok(())
    }

    fn active_window(&self) -> Result<Option<Window>> {
        let reply = self
            .connection
            .get_property(false, self.root, self.active_window_atom, AtomEnum::WINDOW, 0, 1)
            .map_err(|e| Error::PresentationControl(format!("Failed to request active window: {e}")))?
            .reply()
            .map_err(|e| Error::PresentationControl(format!("Failed to read active window: {e}")))?;

        Ok(reply
            .value32()
            .and_then(|mut values| values.next())
            .filter(|&window| window != x11rb::NONE))
    }

    fn window_title_of(&self, window: Window) -> Result<String> {
        let utf8 = self.read_text_property(window, self.wm_name_atom, self.utf8_string_atom)?;
        if !utf8.is_empty() {
            return Ok(utf8);
        }
        self.read_text_property(window, AtomEnum::WM_NAME.into(), AtomEnum::STRING.into())
    }

    fn read_text_property(&self, window: Window, property: Atom, type_: Atom) -> Result<String> {
        let reply = self
            .connection
            .get_property(false, window, property, type_, 0, 1024)
            .map_err(|e| Error::PresentationControl(format!("Failed to request window title: {e}")))?
            .reply()
            .map_err(|e| Error::PresentationControl(format!("Failed to read window title: {e}")))?;

        Ok(String::from_utf8_lossy(&reply.value).into_owned())
    }
}

impl PresentationTarget for X11PresentationTarget {
    fn next(&mut self) -> Result<()> {
        self.tap(self.next_key)
    }

    fn previous(&mut self) -> Result<()> {
        self.tap(self.previous_key)
    }

    fn exit(&mut self) -> Result<()> {
        self.tap(self.exit_key)
    }

    fn is_session_active(&self) -> Result<bool> {
        let Some(window) = self.active_window()? else {
            return Ok(false);
        };

        match &self.window_title {
            None => Ok(true),
            Some(wanted) => {
                let title = self.window_title_of(window)?;
                let active = title.contains(wanted.as_str());
                if !active {
                    debug!("Active window \"{}\" does not match \"{}\"", title, wanted);
                }
                Ok(active)
            }
        }
    }

    fn name(&self) -> &str {
        "x11"
    }
}

fn intern(connection: &RustConnection, name: &[u8]) -> Result<Atom> {
    Ok(connection
        .intern_atom(false, name)
        .map_err(|e| Error::PresentationControl(format!("Failed to intern atom: {e}")))?
        .reply()
        .map_err(|e| Error::PresentationControl(format!("Failed to intern atom: {e}")))?
        .atom)
}

fn resolve_keycode(connection: &RustConnection, name: &str) -> Result<Keycode> {
    let keysym = keysym_from_name(name).ok_or_else(|| Error::ConfigError(format!("Unknown key name: {name}")))?;

    let setup = connection.setup();
    let (min_keycode, max_keycode) = (setup.min_keycode, setup.max_keycode);
    let count = max_keycode.saturating_sub(min_keycode).saturating_add(1);

    let mapping = connection
        .get_keyboard_mapping(min_keycode, count)
        .map_err(|e| Error::PresentationControl(format!("Failed to request keyboard mapping: {e}")))?
        .reply()
        .map_err(|e| Error::PresentationControl(format!("Failed to read keyboard mapping: {e}")))?;

    let per_keycode = usize::from(mapping.keysyms_per_keycode.max(1));
    let position = mapping
        .keysyms
        .chunks(per_keycode)
        .position(|syms| syms.contains(&keysym))
        .ok_or_else(|| Error::PresentationControl(format!("No keycode produces key {name}")))?;

    let keycode = u8::try_from(position)
        .ok()
        .and_then(|offset| min_keycode.checked_add(offset))
        .ok_or_else(|| Error::PresentationControl(format!("Keycode for {name} out of range")))?;

    debug!("Key {} (keysym {:#x}) -> keycode {}", name, keysym, keycode);
    Ok(keycode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keysym_names() {
        assert_eq!(keysym_from_name("Right"), Some(0xff53));
        assert_eq!(keysym_from_name("escape"), Some(0xff1b));
        assert_eq!(keysym_from_name("Page_Down"), keysym_from_name("Next"));
        assert_eq!(keysym_from_name("N"), Some(u32::from(b'n')));
        assert_eq!(keysym_from_name("5"), Some(u32::from(b'5')));
        assert_eq!(keysym_from_name("NoSuchKey"), None);
        assert_eq!(keysym_from_name(""), None);
    }

    #[test]
    #[ignore] // Requires X11 display with XTEST
    fn test_x11_target_creation() {
        let target = X11PresentationTarget::new(&PresentationConfig::default());
        if let Ok(target) = target {
            assert_eq!(target.name(), "x11");
            assert!(target.is_session_active().is_ok());
        }
    }
}
