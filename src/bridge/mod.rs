use duckdb::vtab::Value;
use libduckdb_sys::duckdb_free;
use libduckdb_sys::duckdb_get_varchar;
use libduckdb_sys::duckdb_value;
use std::ffi::CStr;
use std::os::raw::c_void;

/// Extends DuckDB's `Value` with the string conversion the table function parameters need,
/// going through the raw `duckdb_value` handle.
pub(crate) trait ValueBridge {
    /// Extracts the raw `duckdb_value` pointer wrapped by the `Value`.
    ///
    /// # Safety
    ///
    /// Relies on `Value` being a plain wrapper around a single `duckdb_value` field. That
    /// layout is not part of the duckdb-rs API; a release that changes it turns the
    /// conversion below into undefined behavior.
    unsafe fn get_value_ptr(&self) -> duckdb_value;

    /// Returns the value as a String, empty for SQL NULL
    fn to_varchar(&self) -> String;
}

impl ValueBridge for Value {
    /// Reinterprets the `Value` reference as the `duckdb_value` it wraps.
    unsafe fn get_value_ptr(&self) -> duckdb_value {
        unsafe { *(self as *const Value as *const duckdb_value) }
    }

    fn to_varchar(&self) -> String {
        if self.is_null() {
            return String::new();
        }
        unsafe {
            let varchar = duckdb_get_varchar(self.get_value_ptr());
            if varchar.is_null() {
                return String::new();
            }
            let string = CStr::from_ptr(varchar).to_string_lossy().into_owned();
            duckdb_free(varchar as *mut c_void);
            string
        }
    }
}
