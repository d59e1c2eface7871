//! Raw `mssign32` bindings for `SignerSignEx3`.
//!
//! Hand-declared prototypes and `#[repr(C)]` structures for the subset of the
//! signing API this crate drives. Every native handle acquired during a sign
//! call is held by a guard and released in reverse acquisition order on every
//! exit path.

use std::cell::RefCell;
use std::ffi::{c_void, CString};
use std::os::windows::ffi::OsStrExt;
use std::ptr;

use super::{DigestSignCallback, DigestSignInput, STATUS_CALLBACK_FAILED, STATUS_SUCCESS};
use crate::services::request_assembler::SigningRequest;

const X509_ASN_ENCODING: u32 = 0x0000_0001;
const PKCS_7_ASN_ENCODING: u32 = 0x0001_0000;
const ENCODING: u32 = X509_ASN_ENCODING | PKCS_7_ASN_ENCODING;

/// CERT_STORE_PROV_MEMORY, passed as an integer resource.
const CERT_STORE_PROV_MEMORY: *const u8 = 2 as *const u8;
const CERT_STORE_ADD_REPLACE_EXISTING: u32 = 3;

const SIGNER_SUBJECT_FILE: u32 = 0x01;
const SIGNER_CERT_STORE: u32 = 0x02;
const SIGNER_CERT_POLICY_CHAIN: u32 = 0x02;
const SIGNER_AUTHCODE_ATTR: u32 = 0x01;

/// SIGNER_DIGEST_SIGN_INFO.dwDigestSignChoice for the plain digest callback.
const DIGEST_SIGN: u32 = 0x01;

const LMEM_FIXED: u32 = 0;

#[repr(C)]
struct CryptDataBlob {
    cb_data: u32,
    pb_data: *mut u8,
}

#[repr(C)]
struct CertContext {
    dw_cert_encoding_type: u32,
    pb_cert_encoded: *const u8,
    cb_cert_encoded: u32,
    p_cert_info: *const c_void,
    h_cert_store: *mut c_void,
}

#[repr(C)]
struct SignerFileInfo {
    cb_size: u32,
    pwsz_file_name: *const u16,
    h_file: *mut c_void,
}

#[repr(C)]
struct SignerSubjectInfo {
    cb_size: u32,
    pdw_index: *const u32,
    dw_subject_choice: u32,
    // Union of SIGNER_FILE_INFO* / SIGNER_BLOB_INFO*; only files are signed here.
    p_signer_file_info: *const SignerFileInfo,
}

#[repr(C)]
struct SignerCertStoreInfo {
    cb_size: u32,
    p_signing_cert: *const CertContext,
    dw_cert_policy: u32,
    h_cert_store: *mut c_void,
}

#[repr(C)]
struct SignerCert {
    cb_size: u32,
    dw_cert_choice: u32,
    // Union; always SIGNER_CERT_STORE here.
    p_cert_store_info: *const SignerCertStoreInfo,
    hwnd: *mut c_void,
}

#[repr(C)]
struct SignerAttrAuthcode {
    cb_size: u32,
    pwsz_name: *const u16,
    pwsz_info: *const u16,
}

#[repr(C)]
struct SignerSignatureInfo {
    cb_size: u32,
    alg_id_hash: u32,
    dw_attr_choice: u32,
    p_attr_authcode: *const SignerAttrAuthcode,
    ps_authenticated: *const c_void,
    ps_unauthenticated: *const c_void,
}

type AuthenticodeDigestSign = unsafe extern "system" fn(
    p_signer_cert: *const CertContext,
    p_metadata_blob: *mut CryptDataBlob,
    dw_alg_id: u32,
    pb_to_be_signed_digest: *const u8,
    cb_to_be_signed_digest: u32,
    p_signed_digest: *mut CryptDataBlob,
) -> i32;

#[repr(C)]
struct SignerDigestSignInfo {
    cb_size: u32,
    dw_digest_sign_choice: u32,
    pfn_authenticode_digest_sign: Option<AuthenticodeDigestSign>,
    p_metadata_blob: *mut CryptDataBlob,
}

#[link(name = "crypt32")]
extern "system" {
    fn CertOpenStore(
        lpsz_store_provider: *const u8,
        dw_encoding_type: u32,
        h_crypt_prov: usize,
        dw_flags: u32,
        pv_para: *const c_void,
    ) -> *mut c_void;
    fn CertCloseStore(h_cert_store: *mut c_void, dw_flags: u32) -> i32;
    fn CertAddEncodedCertificateToStore(
        h_cert_store: *mut c_void,
        dw_cert_encoding_type: u32,
        pb_cert_encoded: *const u8,
        cb_cert_encoded: u32,
        dw_add_disposition: u32,
        pp_cert_context: *mut *const CertContext,
    ) -> i32;
    fn CertCreateCertificateContext(
        dw_cert_encoding_type: u32,
        pb_cert_encoded: *const u8,
        cb_cert_encoded: u32,
    ) -> *const CertContext;
    fn CertFreeCertificateContext(p_cert_context: *const CertContext) -> i32;
}

#[link(name = "mssign32")]
extern "system" {
    fn SignerSignEx3(
        dw_flags: u32,
        p_subject_info: *const SignerSubjectInfo,
        p_signer_cert: *const SignerCert,
        p_signature_info: *const SignerSignatureInfo,
        p_provider_info: *const c_void,
        dw_timestamp_flags: u32,
        psz_timestamp_algorithm_oid: *const u8,
        pwsz_http_time_stamp: *const u16,
        ps_request: *const c_void,
        p_sip_data: *const c_void,
        pp_signer_context: *mut *mut c_void,
        p_crypto_policy: *const c_void,
        p_sign_info: *const SignerDigestSignInfo,
        p_reserved: *const c_void,
    ) -> i32;
    fn SignerFreeSignerContext(p_signer_context: *mut c_void) -> i32;
}

#[link(name = "kernel32")]
extern "system" {
    fn LocalAlloc(u_flags: u32, u_bytes: usize) -> *mut c_void;
}

/// NUL-terminated UTF-16 string for PCWSTR parameters.
struct WideString(Vec<u16>);

impl WideString {
    fn new(s: &str) -> Self {
        let mut wide: Vec<u16> = std::ffi::OsStr::new(s).encode_wide().collect();
        wide.push(0);
        WideString(wide)
    }

    fn as_ptr(&self) -> *const u16 {
        self.0.as_ptr()
    }
}

struct MemoryStoreGuard(*mut c_void);

impl Drop for MemoryStoreGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe {
                CertCloseStore(self.0, 0);
            }
        }
    }
}

struct CertContextGuard(*const CertContext);

impl Drop for CertContextGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe {
                CertFreeCertificateContext(self.0);
            }
        }
    }
}

struct SignerContextGuard(*mut c_void);

impl Drop for SignerContextGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe {
                SignerFreeSignerContext(self.0);
            }
        }
    }
}

// SignerSignEx3 invokes the digest-sign callback without a user-data pointer,
// so the active callback is parked in a thread-local for the duration of the
// call. The callback contract guarantees same-thread invocation.
thread_local! {
    static ACTIVE_CALLBACK: RefCell<Option<*mut DigestSignCallback<'static>>> =
        const { RefCell::new(None) };
}

struct CallbackInstallGuard;

impl CallbackInstallGuard {
    fn install(callback: &mut DigestSignCallback<'_>) -> Self {
        let raw = callback as *mut DigestSignCallback<'_>;
        // Lifetime erased while parked; the guard removes the pointer before
        // the borrow ends.
        let raw: *mut DigestSignCallback<'static> = unsafe { std::mem::transmute(raw) };
        ACTIVE_CALLBACK.with(|slot| *slot.borrow_mut() = Some(raw));
        CallbackInstallGuard
    }
}

impl Drop for CallbackInstallGuard {
    fn drop(&mut self) {
        ACTIVE_CALLBACK.with(|slot| *slot.borrow_mut() = None);
    }
}

unsafe extern "system" fn digest_sign_trampoline(
    p_signer_cert: *const CertContext,
    _p_metadata_blob: *mut CryptDataBlob,
    dw_alg_id: u32,
    pb_to_be_signed_digest: *const u8,
    cb_to_be_signed_digest: u32,
    p_signed_digest: *mut CryptDataBlob,
) -> i32 {
    let callback = ACTIVE_CALLBACK.with(|slot| *slot.borrow());
    let Some(callback) = callback else {
        return STATUS_CALLBACK_FAILED;
    };

    let digest = std::slice::from_raw_parts(pb_to_be_signed_digest, cb_to_be_signed_digest as usize);
    let certificate_der = if p_signer_cert.is_null() {
        &[]
    } else {
        std::slice::from_raw_parts(
            (*p_signer_cert).pb_cert_encoded,
            (*p_signer_cert).cb_cert_encoded as usize,
        )
    };
    let input = DigestSignInput {
        certificate_der,
        algorithm_id: dw_alg_id,
        digest,
    };

    match (*callback)(input) {
        Ok(signature) => {
            // The blob must point at an unmanaged buffer sized exactly to the
            // signature; ownership passes to the subsystem.
            let len = signature.len();
            let buffer = LocalAlloc(LMEM_FIXED, len).cast::<u8>();
            if buffer.is_null() {
                return STATUS_CALLBACK_FAILED;
            }
            ptr::copy_nonoverlapping(signature.as_slice().as_ptr(), buffer, len);
            (*p_signed_digest).pb_data = buffer;
            (*p_signed_digest).cb_data = len as u32;
            STATUS_SUCCESS
        }
        Err(_) => STATUS_CALLBACK_FAILED,
    }
}

/// `SignerSignEx3`-backed implementation of the signing subsystem.
#[derive(Default)]
pub struct Mssign32Subsystem;

impl Mssign32Subsystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl super::SigningSubsystem for Mssign32Subsystem {
    fn sign(&self, request: &SigningRequest<'_>, callback: &mut DigestSignCallback<'_>) -> i32 {
        unsafe {
            let store = MemoryStoreGuard(CertOpenStore(
                CERT_STORE_PROV_MEMORY,
                0,
                0,
                0,
                ptr::null(),
            ));
            if store.0.is_null() {
                return STATUS_CALLBACK_FAILED;
            }
            for der in request.certificate_store.certificates() {
                let ok = CertAddEncodedCertificateToStore(
                    store.0,
                    ENCODING,
                    der.as_ptr(),
                    der.len() as u32,
                    CERT_STORE_ADD_REPLACE_EXISTING,
                    ptr::null_mut(),
                );
                if ok == 0 {
                    return STATUS_CALLBACK_FAILED;
                }
            }

            let leaf = CertContextGuard(CertCreateCertificateContext(
                ENCODING,
                request.certificate_der.as_ptr(),
                request.certificate_der.len() as u32,
            ));
            if leaf.0.is_null() {
                return STATUS_CALLBACK_FAILED;
            }

            let path = WideString::new(&request.path.to_string_lossy());
            let description = request.description.map(WideString::new);
            let description_url = request.description_url.map(WideString::new);
            let timestamp_url = request.timestamp_url.map(|u| WideString::new(u.as_str()));
            let timestamp_oid = request
                .timestamp_algorithm_oid
                .and_then(|oid| CString::new(oid).ok());

            let file_info = SignerFileInfo {
                cb_size: std::mem::size_of::<SignerFileInfo>() as u32,
                pwsz_file_name: path.as_ptr(),
                h_file: ptr::null_mut(),
            };
            let index: u32 = 0;
            let subject_info = SignerSubjectInfo {
                cb_size: std::mem::size_of::<SignerSubjectInfo>() as u32,
                pdw_index: &index,
                dw_subject_choice: SIGNER_SUBJECT_FILE,
                p_signer_file_info: &file_info,
            };

            let store_info = SignerCertStoreInfo {
                cb_size: std::mem::size_of::<SignerCertStoreInfo>() as u32,
                p_signing_cert: leaf.0,
                dw_cert_policy: SIGNER_CERT_POLICY_CHAIN,
                h_cert_store: store.0,
            };
            let signer_cert = SignerCert {
                cb_size: std::mem::size_of::<SignerCert>() as u32,
                dw_cert_choice: SIGNER_CERT_STORE,
                p_cert_store_info: &store_info,
                hwnd: ptr::null_mut(),
            };

            let attributes = SignerAttrAuthcode {
                cb_size: std::mem::size_of::<SignerAttrAuthcode>() as u32,
                pwsz_name: description.as_ref().map_or(ptr::null(), WideString::as_ptr),
                pwsz_info: description_url
                    .as_ref()
                    .map_or(ptr::null(), WideString::as_ptr),
            };
            let signature_info = SignerSignatureInfo {
                cb_size: std::mem::size_of::<SignerSignatureInfo>() as u32,
                alg_id_hash: request.digest_algorithm.alg_id(),
                dw_attr_choice: SIGNER_AUTHCODE_ATTR,
                p_attr_authcode: &attributes,
                ps_authenticated: ptr::null(),
                ps_unauthenticated: ptr::null(),
            };

            let sign_info = SignerDigestSignInfo {
                cb_size: std::mem::size_of::<SignerDigestSignInfo>() as u32,
                dw_digest_sign_choice: DIGEST_SIGN,
                pfn_authenticode_digest_sign: Some(digest_sign_trampoline),
                p_metadata_blob: ptr::null_mut(),
            };

            let _installed = CallbackInstallGuard::install(callback);
            let mut signer_context: *mut c_void = ptr::null_mut();
            let status = SignerSignEx3(
                request.flags,
                &subject_info,
                &signer_cert,
                &signature_info,
                ptr::null(),
                request.timestamp_flags,
                timestamp_oid
                    .as_ref()
                    .map_or(ptr::null(), |oid| oid.as_ptr().cast()),
                timestamp_url
                    .as_ref()
                    .map_or(ptr::null(), WideString::as_ptr),
                ptr::null(),
                ptr::null(),
                &mut signer_context,
                ptr::null(),
                &sign_info,
                ptr::null(),
            );
            let _context = SignerContextGuard(signer_context);
            status
        }
    }
}
