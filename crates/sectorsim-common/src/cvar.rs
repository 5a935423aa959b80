// cvar.rs -- dynamic variable tracking
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

use crate::common::com_printf;
use crate::shared::CvarFlags;

use std::collections::HashMap;

/// A console variable.
#[derive(Clone, Debug)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub flags: CvarFlags,
    pub value: f32,
}

/// The full cvar system context.
#[derive(Default)]
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
}

fn parse_value(s: &str) -> f32 {
    s.trim().parse::<f32>().unwrap_or(0.0)
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names may not contain whitespace, quotes or separators.
    pub fn name_validate(s: &str) -> bool {
        !s.is_empty() && !s.contains(|c: char| c.is_whitespace() || c == '"' || c == ';')
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |var| var.value)
    }

    /// Get or create a cvar. If it already exists, the value is not changed
    /// but flags are OR'd in.
    pub fn get(&mut self, name: &str, value: Option<&str>, flags: CvarFlags) -> Option<usize> {
        if !Self::name_validate(name) {
            com_printf(&format!("invalid cvar name \"{}\"\n", name));
            return None;
        }

        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return Some(idx);
        }

        let value = value?;

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            flags,
            value: parse_value(value),
        });
        self.cvar_index.insert(name.to_string(), idx);

        Some(idx)
    }

    /// Set a cvar value, creating it if needed.
    pub fn force_set(&mut self, name: &str, value: &str) -> Option<usize> {
        let Some(&idx) = self.cvar_index.get(name) else {
            return self.get(name, Some(value), CvarFlags::empty());
        };
        let var = &mut self.cvar_vars[idx];
        if var.string != value {
            var.string = value.to_string();
            var.value = parse_value(value);
        }
        Some(idx)
    }
}

// ============================================================
// Global singleton and free-function wrappers
// ============================================================

use parking_lot::Mutex;

static CVAR_CTX: Mutex<Option<CvarContext>> = parking_lot::const_mutex(None);

pub fn cvar_init() {
    let mut g = CVAR_CTX.lock();
    if g.is_none() {
        *g = Some(CvarContext::new());
    }
}

pub fn cvar_get(name: &str, value: &str, flags: CvarFlags) -> Option<usize> {
    CVAR_CTX.lock().as_mut().and_then(|c| c.get(name, Some(value), flags))
}

pub fn cvar_force_set(name: &str, value: &str) {
    if let Some(ref mut c) = *CVAR_CTX.lock() {
        c.force_set(name, value);
    }
}

pub fn cvar_variable_value(name: &str) -> f32 {
    CVAR_CTX.lock().as_ref().map_or(0.0, |c| c.variable_value(name))
}

/// Access the global CVAR_CTX with a closure. Returns None if not initialized.
pub fn with_cvar_ctx<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut CvarContext) -> R,
{
    let mut g = CVAR_CTX.lock();
    g.as_mut().map(f)
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{CVAR_ARCHIVE, CVAR_LATCH, CVAR_ZERO};

    #[test]
    fn test_cvar_get_and_find() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", Some("42"), CVAR_ZERO);
        assert_eq!(ctx.variable_value("test_var"), 42.0);
        assert_eq!(ctx.find_var("test_var").map(|v| v.string.as_str()), Some("42"));
    }

    #[test]
    fn test_cvar_force_set() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", Some("10"), CVAR_LATCH);
        ctx.force_set("test_var", "20");
        assert_eq!(ctx.variable_value("test_var"), 20.0);
        ctx.force_set("fresh", "3");
        assert_eq!(ctx.variable_value("fresh"), 3.0);
    }

    #[test]
    fn test_cvar_not_found() {
        let ctx = CvarContext::new();
        assert_eq!(ctx.variable_value("nonexistent"), 0.0);
        assert!(ctx.find_var("nonexistent").is_none());
    }

    #[test]
    fn test_cvar_get_creates_once() {
        let mut ctx = CvarContext::new();
        ctx.get("test", Some("1"), CVAR_ZERO);
        ctx.get("test", Some("2"), CVAR_ARCHIVE);
        assert_eq!(ctx.variable_value("test"), 1.0);
        assert!(ctx.find_var("test").is_some_and(|v| v.flags.contains(CVAR_ARCHIVE)));
    }

    #[test]
    fn test_cvar_get_without_default_does_not_create() {
        let mut ctx = CvarContext::new();
        assert!(ctx.get("missing", None, CVAR_ZERO).is_none());
        assert!(ctx.cvar_vars.is_empty());
    }

    #[test]
    fn test_cvar_invalid_name() {
        let mut ctx = CvarContext::new();
        assert!(ctx.get("bad name", Some("value"), CVAR_ZERO).is_none());
        assert!(ctx.get("", Some("value"), CVAR_ZERO).is_none());
    }

    #[test]
    fn test_cvar_non_numeric_value_is_zero() {
        let mut ctx = CvarContext::new();
        ctx.get("label", Some("abc"), CVAR_ZERO);
        assert_eq!(ctx.variable_value("label"), 0.0);
    }
}
