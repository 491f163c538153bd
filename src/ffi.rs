//! JNI bridge.
//!
//! `JNI_OnLoad` registers the natives of
//! `com.sheep.sphunter.fingerprint.jni.NativeFingerprint` by hand, so no
//! `Java_*` symbol names are exported. Every native returns a Java string and
//! never lets a panic unwind into the JVM: a panic inside collection becomes
//! `\nError: <msg>\n` text, and a failure to allocate the string returns null.
//!
//! # Safety
//!
//! `unsafe` appears only where the raw `JavaVM*` handed over by the runtime is
//! wrapped. Everything behind the boundary is safe Rust.

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};

use jni::objects::JClass;
use jni::sys::{jint, jstring, JNI_ERR, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM, NativeMethod};

use crate::collector::FingerprintCollector;
use crate::config::LogConfig;
use crate::error::{panic_message, Result};
use crate::logging;
use crate::net::MAC_FAILURE;

pub const NATIVE_CLASS: &str = "com/sheep/sphunter/fingerprint/jni/NativeFingerprint";

const STRING_SIGNATURE: &str = "()Ljava/lang/String;";

/// Run one native's work. A panic is logged and answered with `on_panic(msg)`.
fn serve(
    native: &str,
    work: impl FnOnce() -> String,
    on_panic: impl FnOnce(&str) -> String,
) -> String {
    logging::init(&LogConfig::default());
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let msg = panic_message(payload.as_ref());
        log::error!("Error in {}: {}", native, msg);
        on_panic(&msg)
    })
}

/// Text served by `getCFingerprint`.
pub fn fingerprint_text() -> String {
    serve(
        "getCFingerprint",
        || FingerprintCollector::default().collect_native(),
        |msg| format!("\nError: {}\n", msg),
    )
}

/// Text served by `getMacAddress`.
pub fn mac_text() -> String {
    serve(
        "getMacAddress",
        || FingerprintCollector::default().primary_mac(),
        |_| MAC_FAILURE.to_string(),
    )
}

fn to_jstring(env: &JNIEnv, text: &str) -> jstring {
    match env.new_string(text) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            log::error!("NewStringUTF failed: {}", e);
            std::ptr::null_mut()
        }
    }
}

extern "system" fn get_c_fingerprint(env: JNIEnv, _class: JClass) -> jstring {
    panic::catch_unwind(AssertUnwindSafe(|| to_jstring(&env, &fingerprint_text())))
        .unwrap_or(std::ptr::null_mut())
}

extern "system" fn get_mac_address(env: JNIEnv, _class: JClass) -> jstring {
    panic::catch_unwind(AssertUnwindSafe(|| to_jstring(&env, &mac_text())))
        .unwrap_or(std::ptr::null_mut())
}

fn native_methods() -> [NativeMethod; 2] {
    [
        NativeMethod {
            name: "getCFingerprint".into(),
            sig: STRING_SIGNATURE.into(),
            fn_ptr: get_c_fingerprint as *mut c_void,
        },
        NativeMethod {
            name: "getMacAddress".into(),
            sig: STRING_SIGNATURE.into(),
            fn_ptr: get_mac_address as *mut c_void,
        },
    ]
}

fn register_natives(vm: &JavaVM) -> Result<()> {
    let mut env = vm.get_env()?;
    env.register_native_methods(NATIVE_CLASS, &native_methods())?;
    Ok(())
}

/// # Safety
/// Called by the runtime with a valid `JavaVM*`.
#[no_mangle]
pub unsafe extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    panic::catch_unwind(AssertUnwindSafe(|| {
        logging::init(&LogConfig::default());
        log::info!("JNI_OnLoad called");

        let vm = match unsafe { JavaVM::from_raw(vm) } {
            Ok(vm) => vm,
            Err(e) => {
                log::error!("Invalid JavaVM: {}", e);
                return JNI_ERR;
            }
        };
        match register_natives(&vm) {
            Ok(()) => {
                log::info!("Registered natives for {}", NATIVE_CLASS);
                JNI_VERSION_1_6
            }
            Err(e) => {
                log::error!("Failed to register natives for {}: {}", NATIVE_CLASS, e);
                JNI_ERR
            }
        }
    }))
    .unwrap_or(JNI_ERR)
}

#[no_mangle]
pub extern "system" fn JNI_OnUnload(_vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) {
    let _ = panic::catch_unwind(|| log::info!("JNI_OnUnload called"));
}
