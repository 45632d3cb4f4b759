//! sqlite-vec extension loader.
//!
//! The only unsafe code in the crate lives here, isolated so the rest of the
//! storage layer stays safe.

use rusqlite::ffi::{sqlite3, sqlite3_api_routines, sqlite3_auto_extension};
use sqlite_vec::sqlite3_vec_init;

type SqliteExtensionFn =
    unsafe extern "C" fn(*mut sqlite3, *mut *mut i8, *const sqlite3_api_routines) -> i32;

/// Register sqlite-vec as an auto-loaded extension for all future
/// connections.
///
/// Must be called once at startup, before any connection that queries a
/// vec0 virtual table is opened.
///
/// # Safety
/// Uses FFI to register a `SQLite` extension; call once at startup.
#[allow(unsafe_code)]
pub fn init_sqlite_vec_extension() {
    // SAFETY: sqlite3_auto_extension is a stable SQLite API and
    // sqlite3_vec_init is the entry point exported by the sqlite-vec crate.
    unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute::<*const (), SqliteExtensionFn>(
            sqlite3_vec_init as *const (),
        )));
    }
}
