//! FFI bindings for the focus classifier
//!
//! This module provides C-compatible functions so a host transport (HTTP
//! server, mobile shell, ...) can score sessions and generate corpora. All
//! functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `focus_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::corpus::CorpusGenerator;
use crate::inference::InferenceService;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Scoring Service
// ============================================================================

/// Opaque handle to a loaded InferenceService
pub struct FocusServiceHandle {
    service: InferenceService,
}

/// Load the classifier artifact at `path` and create a scoring service.
///
/// # Safety
/// - `path` must be a valid null-terminated C string.
/// - Returns a pointer that must be freed with `focus_service_free`.
/// - Returns NULL if the artifact is missing or corrupt; call `focus_last_error`.
#[no_mangle]
pub unsafe extern "C" fn focus_service_load(path: *const c_char) -> *mut FocusServiceHandle {
    clear_last_error();

    let path_str = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return ptr::null_mut();
        }
    };

    match InferenceService::load(&path_str) {
        Ok(service) => Box::into_raw(Box::new(FocusServiceHandle { service })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a scoring service.
///
/// # Safety
/// - `service` must be a valid pointer returned by `focus_service_load`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn focus_service_free(service: *mut FocusServiceHandle) {
    if !service.is_null() {
        drop(Box::from_raw(service));
    }
}

/// Score a session record (JSON object) and return the verdict JSON
/// `{"prediction": 0|1, "confidence": number}`.
///
/// The service is read-only; one handle may be used from several threads.
///
/// # Safety
/// - `service` must be a valid pointer returned by `focus_service_load`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `focus_free_string`.
/// - Returns NULL on error; call `focus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn focus_service_score(
    service: *const FocusServiceHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if service.is_null() {
        set_last_error("Null service pointer");
        return ptr::null_mut();
    }

    let handle = &*service;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.service.score_json(&json_str) {
        Ok(verdict) => string_to_cstr(&verdict),
        Err(e) => {
            set_last_error(&format!("{}: {}", e.kind(), e));
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Corpus Generation
// ============================================================================

/// Generate a labeled corpus and write it as CSV to `path`.
///
/// `per_class <= 0` uses the default of 500. A negative `seed` draws from
/// system entropy; otherwise the corpus is reproducible.
///
/// # Safety
/// - `path` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; call `focus_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn focus_generate_corpus(
    path: *const c_char,
    per_class: i32,
    seed: i64,
) -> i32 {
    clear_last_error();

    let path_str = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return -1;
        }
    };

    let generator = if per_class > 0 {
        CorpusGenerator::new().with_per_class(per_class as usize)
    } else {
        Ok(CorpusGenerator::new())
    };
    let seed = if seed < 0 { None } else { Some(seed as u64) };

    match generator.and_then(|g| g.generate_to(&path_str, seed)) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by focus functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a focus function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn focus_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next focus function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn focus_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn focus_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::LabeledCorpus;
    use crate::model::{ModelArtifact, TrainingOptions};
    use std::ffi::CString;

    fn c_path(path: &std::path::Path) -> CString {
        CString::new(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_ffi_service_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = dir.path().join("sessions.csv");
        let model_path = dir.path().join("model.json");

        unsafe {
            assert_eq!(focus_generate_corpus(c_path(&corpus_path).as_ptr(), 200, 3), 0);
        }
        let corpus = LabeledCorpus::read_csv(&corpus_path).unwrap();
        assert_eq!(corpus.len(), 400);
        ModelArtifact::train(&corpus, TrainingOptions::default())
            .unwrap()
            .save(&model_path)
            .unwrap();

        unsafe {
            let service = focus_service_load(c_path(&model_path).as_ptr());
            assert!(!service.is_null());

            let record = CString::new(
                r#"{"duration": 20, "switch_count": 15, "switch_rate": 0.75, "active_ratio": 0.40}"#,
            )
            .unwrap();
            let result = focus_service_score(service, record.as_ptr());
            assert!(!result.is_null());

            let verdict: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(verdict["prediction"], 1);

            focus_free_string(result);
            focus_service_free(service);
        }
    }

    #[test]
    fn test_ffi_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        unsafe {
            let service = focus_service_load(c_path(&path).as_ptr());
            assert!(service.is_null());

            let error = CStr::from_ptr(focus_last_error()).to_str().unwrap();
            assert!(error.contains("Model unavailable"));
        }
    }

    #[test]
    fn test_ffi_null_service() {
        let record = CString::new("{}").unwrap();
        unsafe {
            let result = focus_service_score(ptr::null(), record.as_ptr());
            assert!(result.is_null());
            assert!(!focus_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_generate_into_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("sessions.csv");
        unsafe {
            assert_eq!(focus_generate_corpus(c_path(&path).as_ptr(), 5, 1), -1);
            assert!(!focus_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_generate_rejects_oversized_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.csv");
        unsafe {
            assert_eq!(focus_generate_corpus(c_path(&path).as_ptr(), i32::MAX, 1), -1);
            let error = CStr::from_ptr(focus_last_error()).to_str().unwrap();
            assert!(error.contains("exceeds"));
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = focus_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
