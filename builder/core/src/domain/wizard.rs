// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Builder Wizard Controller
//!
//! Tracks which section of the agent builder is active and which sections have
//! been completed, and maps keyboard shortcuts onto navigation.
//!
//! ## Invariants
//!
//! - The active section is always a member of the registry. It is stored as an
//!   index into the (non-empty, immutable) section list, so an invalid active
//!   section is unrepresentable.
//! - Completed ids are a subset of registry ids and are never removed, so
//!   [`Wizard::progress_percentage`] is monotonic within a session.
//! - Navigation is clamped at both ends; there is no wraparound.
//!
//! All operations are total: unknown ids are ignored rather than reported.

use std::collections::HashSet;

use crate::domain::section::{builder_sections, SectionDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Wizard requires at least one section")]
    EmptyRegistry,

    #[error("Duplicate section id: '{0}'")]
    DuplicateSection(String),
}

/// Physical key of a keyboard event, as far as the wizard cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Ctrl on Linux/Windows, Cmd on macOS. Either one counts.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Chord with the platform command modifier held.
    pub fn command(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardShortcut {
    Next,
    Previous,
    ToggleCommandPalette,
    Save,
}

/// Outcome of [`Wizard::handle_key`].
///
/// `Handled` means the host must suppress its default handling of the event
/// (the browser's `preventDefault`, a terminal's own binding, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    Handled(WizardShortcut),
    Ignored,
}

impl KeyDisposition {
    pub fn prevent_default(&self) -> bool {
        matches!(self, KeyDisposition::Handled(_))
    }
}

/// Navigation and completion state for the builder wizard.
#[derive(Debug, Clone)]
pub struct Wizard {
    sections: Vec<SectionDescriptor>,
    active: usize,
    completed: HashSet<String>,
    command_palette_open: bool,
}

impl Default for Wizard {
    fn default() -> Self {
        Self {
            sections: builder_sections(),
            active: 0,
            completed: HashSet::new(),
            command_palette_open: false,
        }
    }
}

impl Wizard {
    /// Build a wizard over `sections`, starting at the first one.
    pub fn new(sections: Vec<SectionDescriptor>) -> Result<Self, WizardError> {
        if sections.is_empty() {
            return Err(WizardError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for section in &sections {
            if !seen.insert(section.id.as_str()) {
                return Err(WizardError::DuplicateSection(section.id.clone()));
            }
        }

        Ok(Self {
            sections,
            active: 0,
            completed: HashSet::new(),
            command_palette_open: false,
        })
    }

    pub fn sections(&self) -> &[SectionDescriptor] {
        &self.sections
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_section(&self) -> &SectionDescriptor {
        &self.sections[self.active]
    }

    pub fn active_section_id(&self) -> &str {
        &self.sections[self.active].id
    }

    pub fn is_first(&self) -> bool {
        self.active == 0
    }

    pub fn is_last(&self) -> bool {
        self.active + 1 == self.sections.len()
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }

    /// Activate `id`. Unknown ids leave the wizard unchanged.
    ///
    /// Returns `true` if `id` is now the active section.
    pub fn go_to_section(&mut self, id: &str) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.active = index;
                true
            }
            None => false,
        }
    }

    /// Advance one section. No-op on the last section; returns whether it moved.
    pub fn go_to_next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.active += 1;
        true
    }

    /// Step back one section. No-op on the first section; returns whether it moved.
    pub fn go_to_previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.active -= 1;
        true
    }

    /// Record `id` as completed. Idempotent; unknown ids are ignored.
    ///
    /// Returns `true` only when the id was newly added.
    pub fn mark_section_complete(&mut self, id: &str) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        self.completed.insert(id.to_string())
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_section_id() == id
    }

    /// Completed ids in registry order.
    pub fn completed_section_ids(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| self.completed.contains(&s.id))
            .map(|s| s.id.as_str())
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Share of completed sections in percent, recomputed on every call.
    pub fn progress_percentage(&self) -> f64 {
        self.completed.len() as f64 / self.sections.len() as f64 * 100.0
    }

    pub fn command_palette_open(&self) -> bool {
        self.command_palette_open
    }

    /// Dispatch a keyboard shortcut.
    ///
    /// Only chords with the command modifier are considered; everything else
    /// is left to the host.
    pub fn handle_key(&mut self, chord: KeyChord) -> KeyDisposition {
        if !chord.modifiers.command() {
            return KeyDisposition::Ignored;
        }

        match chord.key {
            Key::ArrowRight => {
                self.go_to_next();
                KeyDisposition::Handled(WizardShortcut::Next)
            }
            Key::ArrowLeft => {
                self.go_to_previous();
                KeyDisposition::Handled(WizardShortcut::Previous)
            }
            Key::Char(c) if c.eq_ignore_ascii_case(&'k') => {
                self.command_palette_open = !self.command_palette_open;
                KeyDisposition::Handled(WizardShortcut::ToggleCommandPalette)
            }
            Key::Char(c) if c.eq_ignore_ascii_case(&'s') => {
                KeyDisposition::Handled(WizardShortcut::Save)
            }
            _ => KeyDisposition::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::section;

    fn three_sections() -> Wizard {
        Wizard::new(vec![
            SectionDescriptor::new("identity", "Identity", "", "BASIC"),
            SectionDescriptor::new("capabilities", "Capabilities", "", "FEATURES"),
            SectionDescriptor::new("data", "Data Sources", "", "INTEGRATION"),
        ])
        .unwrap()
    }

    #[test]
    fn test_next_is_clamped_at_last_section() {
        let mut wizard = three_sections();
        assert_eq!(wizard.active_section_id(), "identity");

        assert!(wizard.go_to_next());
        assert!(wizard.go_to_next());
        assert_eq!(wizard.active_section_id(), "data");

        assert!(!wizard.go_to_next());
        assert_eq!(wizard.active_section_id(), "data");
    }

    #[test]
    fn test_previous_is_clamped_at_first_section() {
        let mut wizard = three_sections();
        assert!(!wizard.go_to_previous());
        assert_eq!(wizard.active_section_id(), "identity");
    }

    #[test]
    fn test_mark_complete_is_idempotent() {
        let mut wizard = three_sections();
        assert!(wizard.mark_section_complete("identity"));
        assert!(!wizard.mark_section_complete("identity"));

        assert_eq!(wizard.completed_section_ids(), vec!["identity"]);
        assert!((wizard.progress_percentage() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut wizard = three_sections();
        wizard.go_to_next();

        assert!(!wizard.go_to_section("monetization"));
        assert_eq!(wizard.active_section_id(), "capabilities");

        assert!(!wizard.mark_section_complete("monetization"));
        assert_eq!(wizard.completed_count(), 0);
    }

    #[test]
    fn test_go_to_section_jumps_anywhere() {
        let mut wizard = Wizard::default();
        assert!(wizard.go_to_section(section::MONETIZATION));
        assert_eq!(wizard.active_index(), 5);
        assert!(wizard.is_active(section::MONETIZATION));
        assert!(wizard.go_to_section(section::IDENTITY));
        assert!(wizard.is_first());
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut wizard = Wizard::default();
        let mut last = wizard.progress_percentage();
        for id in ["identity", "rules", "identity", "bogus", "testing", "rules"] {
            wizard.mark_section_complete(id);
            wizard.go_to_next();
            let now = wizard.progress_percentage();
            assert!(now >= last);
            last = now;
        }
        assert!((last - 300.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_command_arrows_navigate_and_are_intercepted() {
        let mut wizard = three_sections();

        let disposition = wizard.handle_key(KeyChord::command(Key::ArrowRight));
        assert_eq!(disposition, KeyDisposition::Handled(WizardShortcut::Next));
        assert!(disposition.prevent_default());
        assert_eq!(wizard.active_section_id(), "capabilities");

        let meta_left = KeyChord::new(
            Key::ArrowLeft,
            Modifiers {
                meta: true,
                ..Modifiers::default()
            },
        );
        assert!(wizard.handle_key(meta_left).prevent_default());
        assert_eq!(wizard.active_section_id(), "identity");

        // Still intercepted at the boundary, but nothing moves.
        assert!(wizard.handle_key(KeyChord::command(Key::ArrowLeft)).prevent_default());
        assert_eq!(wizard.active_section_id(), "identity");
    }

    #[test]
    fn test_plain_keys_are_left_to_the_host() {
        let mut wizard = three_sections();
        assert_eq!(wizard.handle_key(KeyChord::plain(Key::ArrowRight)), KeyDisposition::Ignored);
        assert_eq!(wizard.active_section_id(), "identity");
        assert_eq!(wizard.handle_key(KeyChord::command(Key::Char('x'))), KeyDisposition::Ignored);
    }

    #[test]
    fn test_palette_toggle_and_save_shortcuts() {
        let mut wizard = three_sections();
        assert!(!wizard.command_palette_open());
        wizard.handle_key(KeyChord::command(Key::Char('k')));
        assert!(wizard.command_palette_open());
        wizard.handle_key(KeyChord::command(Key::Char('K')));
        assert!(!wizard.command_palette_open());

        assert_eq!(
            wizard.handle_key(KeyChord::command(Key::Char('s'))),
            KeyDisposition::Handled(WizardShortcut::Save)
        );
    }

    #[test]
    fn test_new_rejects_bad_registries() {
        assert_eq!(Wizard::new(vec![]).unwrap_err(), WizardError::EmptyRegistry);

        let dup = vec![
            SectionDescriptor::new("a", "A", "", ""),
            SectionDescriptor::new("a", "A again", "", ""),
        ];
        assert_eq!(
            Wizard::new(dup).unwrap_err(),
            WizardError::DuplicateSection("a".to_string())
        );
    }
}
