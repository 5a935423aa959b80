// common.rs -- console output and error reporting
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

pub const ERR_FATAL: i32 = 0;

// ============================================================
// Com_Printf / Com_DPrintf / Com_Error
// ============================================================

/// General-purpose print function.
pub fn com_printf(msg: &str) {
    print!("{}", msg);
}

/// Developer-only print. Controlled by the "developer" cvar.
pub fn com_dprintf(msg: &str) {
    if crate::cvar::cvar_variable_value("developer") == 0.0 {
        return;
    }
    com_printf(msg);
}

/// Engine error handler. Prints to stderr and panics; the engine has no
/// recoverable error level.
pub fn com_error(code: i32, msg: &str) -> ! {
    eprintln!("Error ({}): {}", code, msg);
    panic!("Fatal error: {}", msg);
}
