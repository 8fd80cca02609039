//! OTA firmware update backed by the `esp-ota` crate.
//!
//! Flow: begin → N × queue_chunk (flushed by the main loop) → finalize →
//! reboot.
//!
//! The upload itself arrives on an HTTP handler thread.  That thread only
//! stages chunks; the flash writes happen in [`OtaPort::handle`], called at
//! the top of every loop iteration.  While a session is open the bridge
//! does nothing else, so the robot link stays quiet during the update.
//!
//! The image is hashed while it streams in and must match the SHA-256 the
//! uploader declared before the new partition is made bootable.

use core::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::{info, warn};

use crate::app::ports::OtaPort;

const MAX_FIRMWARE_SIZE: u32 = 4 * 1024 * 1024; // 4 MB

/// Largest chunk the loop will flush in one go.
pub const OTA_STAGING_BUF_SIZE: usize = 4096;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    AlreadyInProgress,
    InvalidSize,
    InvalidSha,
    BeginFailed,
    WriteFailed,
    DigestMismatch,
    VerifyFailed,
    BootSetFailed,
    IncompleteTransfer,
    NotReceiving,
    NonSequential,
    Overflow,
    /// A staged chunk has not been flushed yet.
    Busy,
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "OTA session already in progress"),
            Self::InvalidSize => write!(f, "firmware size out of range (max 4 MB)"),
            Self::InvalidSha => write!(f, "SHA-256 must be exactly 32 bytes"),
            Self::BeginFailed => write!(f, "OTA begin failed"),
            Self::WriteFailed => write!(f, "OTA write failed"),
            Self::DigestMismatch => write!(f, "image SHA-256 does not match"),
            Self::VerifyFailed => write!(f, "OTA verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
            Self::IncompleteTransfer => write!(f, "finalize called before all bytes written"),
            Self::NotReceiving => write!(f, "operation requires active Receiving state"),
            Self::NonSequential => write!(f, "chunk offset does not match expected offset"),
            Self::Overflow => write!(f, "chunk would exceed declared firmware size"),
            Self::Busy => write!(f, "previous chunk not yet written"),
        }
    }
}

impl core::error::Error for OtaError {}

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Receiving {
        expected_size: u32,
        bytes_written: u32,
    },
    WritePending {
        expected_size: u32,
        bytes_written: u32,
        pending_len: u32,
    },
    Verifying,
    ReadyToReboot,
    Failed,
}

// ── Manager ───────────────────────────────────────────────────

/// OTA firmware update manager.
///
/// On ESP-IDF targets, uses the `esp-ota` crate for partition management.
/// On simulation targets the flash writes are skipped.
pub struct OtaManager {
    state: OtaState,
    expected_sha256: [u8; 32],
    hasher: hmac_sha256::Hash,
    staging_buf: [u8; OTA_STAGING_BUF_SIZE],
    #[cfg(target_os = "espidf")]
    ota_update: Option<esp_ota::OtaUpdate>,
}

impl OtaManager {
    pub fn new() -> Self {
        Self {
            state: OtaState::Idle,
            expected_sha256: [0u8; 32],
            hasher: hmac_sha256::Hash::new(),
            staging_buf: [0u8; OTA_STAGING_BUF_SIZE],
            #[cfg(target_os = "espidf")]
            ota_update: None,
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Begin an OTA session. Validates size and opens the inactive partition.
    pub fn begin(&mut self, firmware_size: u32, sha256: &[u8]) -> Result<(), OtaError> {
        if !matches!(self.state, OtaState::Idle | OtaState::Failed) {
            return Err(OtaError::AlreadyInProgress);
        }
        if firmware_size == 0 || firmware_size > MAX_FIRMWARE_SIZE {
            return Err(OtaError::InvalidSize);
        }
        if sha256.len() != 32 {
            return Err(OtaError::InvalidSha);
        }

        self.expected_sha256.copy_from_slice(sha256);
        self.hasher = hmac_sha256::Hash::new();

        #[cfg(target_os = "espidf")]
        {
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("esp-ota begin failed: {:?}", e);
                OtaError::BeginFailed
            })?;
            self.ota_update = Some(update);
        }

        self.state = OtaState::Receiving {
            expected_size: firmware_size,
            bytes_written: 0,
        };
        info!("OTA: begin ({} bytes)", firmware_size);
        Ok(())
    }

    /// [`begin`](Self::begin) with the digest given as 64 hex digits.
    pub fn begin_hex(&mut self, firmware_size: u32, sha256_hex: &str) -> Result<(), OtaError> {
        let digest = hex::decode(sha256_hex.trim()).map_err(|_| OtaError::InvalidSha)?;
        self.begin(firmware_size, &digest)
    }

    /// Write a chunk at the given byte offset immediately. Returns total
    /// bytes written.
    pub fn write_chunk(&mut self, offset: u32, data: &[u8]) -> Result<u32, OtaError> {
        let (expected_size, bytes_written) = self.check_chunk(offset, data)?;
        self.flash_write(data)?;
        let new_written = bytes_written + data.len() as u32;
        self.state = OtaState::Receiving {
            expected_size,
            bytes_written: new_written,
        };
        Ok(new_written)
    }

    /// Stage a chunk for the main loop to write.  Fails with
    /// [`OtaError::Busy`] while the previous chunk is still staged.
    pub fn queue_chunk(&mut self, offset: u32, data: &[u8]) -> Result<u32, OtaError> {
        if self.has_pending() {
            return Err(OtaError::Busy);
        }
        if data.len() > OTA_STAGING_BUF_SIZE {
            return Err(OtaError::Overflow);
        }
        let (expected_size, bytes_written) = self.check_chunk(offset, data)?;

        self.staging_buf[..data.len()].copy_from_slice(data);
        self.state = OtaState::WritePending {
            expected_size,
            bytes_written,
            pending_len: data.len() as u32,
        };
        Ok(bytes_written + data.len() as u32)
    }

    /// Perform the deferred flash write. Returns `true` if a write was
    /// flushed, `false` if nothing was pending.
    pub fn flush_pending(&mut self) -> Result<bool, OtaError> {
        let OtaState::WritePending {
            expected_size,
            bytes_written,
            pending_len,
        } = self.state
        else {
            return Ok(false);
        };

        let staged = self.staging_buf;
        self.flash_write(&staged[..pending_len as usize])?;

        self.state = OtaState::Receiving {
            expected_size,
            bytes_written: bytes_written + pending_len,
        };
        Ok(true)
    }

    /// Returns true if there is a pending write that needs flushing.
    pub fn has_pending(&self) -> bool {
        matches!(self.state, OtaState::WritePending { .. })
    }

    /// An update session is open (including a finished image waiting for
    /// the reboot).
    pub fn is_active(&self) -> bool {
        !matches!(self.state, OtaState::Idle | OtaState::Failed)
    }

    /// Verify the digest, mark the partition bootable, set ReadyToReboot.
    pub fn finalize(&mut self) -> Result<(), OtaError> {
        match self.state {
            OtaState::Receiving {
                expected_size,
                bytes_written,
            } if bytes_written == expected_size => {}
            OtaState::Receiving { .. } | OtaState::WritePending { .. } => {
                return Err(OtaError::IncompleteTransfer);
            }
            _ => return Err(OtaError::NotReceiving),
        }

        self.state = OtaState::Verifying;

        let digest = core::mem::replace(&mut self.hasher, hmac_sha256::Hash::new()).finalize();
        if digest != self.expected_sha256 {
            warn!(
                "OTA: digest mismatch (expected {}, got {})",
                hex::encode(self.expected_sha256),
                hex::encode(digest)
            );
            self.fail();
            return Err(OtaError::DigestMismatch);
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.take() else {
                self.state = OtaState::Failed;
                return Err(OtaError::NotReceiving);
            };
            let mut completed = update.finalize().map_err(|e| {
                warn!("esp-ota finalize failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::VerifyFailed
            })?;

            completed.set_as_boot_partition().map_err(|e| {
                warn!("esp-ota set_as_boot_partition failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::BootSetFailed
            })?;
        }

        self.state = OtaState::ReadyToReboot;
        info!("OTA: finalized, ready to reboot");
        Ok(())
    }

    /// Abort the current OTA session; resets to Idle.
    pub fn abort(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            // esp-ota aborts automatically when OtaUpdate is dropped
            self.ota_update.take();
        }
        self.state = OtaState::Idle;
        warn!("OTA: aborted");
    }

    /// Soft-reset into the newly flashed firmware.
    #[cfg(target_os = "espidf")]
    pub fn reboot(&self) -> ! {
        info!("OTA: rebooting into new firmware");
        esp_idf_svc::hal::reset::restart();
    }

    // ── Internal ──────────────────────────────────────────────

    fn check_chunk(&self, offset: u32, data: &[u8]) -> Result<(u32, u32), OtaError> {
        let OtaState::Receiving {
            expected_size,
            bytes_written,
        } = self.state
        else {
            return Err(OtaError::NotReceiving);
        };

        if offset != bytes_written {
            return Err(OtaError::NonSequential);
        }
        if u64::from(bytes_written) + data.len() as u64 > u64::from(expected_size) {
            return Err(OtaError::Overflow);
        }
        Ok((expected_size, bytes_written))
    }

    fn flash_write(&mut self, data: &[u8]) -> Result<(), OtaError> {
        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.as_mut() else {
                return Err(OtaError::NotReceiving);
            };
            if let Err(e) = update.write(data) {
                warn!("esp-ota write failed: {:?}", e);
                self.fail();
                return Err(OtaError::WriteFailed);
            }
        }
        self.hasher.update(data);
        Ok(())
    }

    fn fail(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            self.ota_update.take();
        }
        self.state = OtaState::Failed;
    }
}

impl Default for OtaManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── Loop integration ──────────────────────────────────────────

impl OtaPort for OtaManager {
    fn handle(&mut self) {
        if let Err(e) = self.flush_pending() {
            warn!("OTA: flush failed: {}", e);
        }
        #[cfg(target_os = "espidf")]
        if self.state == OtaState::ReadyToReboot {
            self.reboot();
        }
    }

    fn in_progress(&self) -> bool {
        self.is_active()
    }
}

/// The manager shared between the loop and the upload handler.
pub type SharedOta = Arc<Mutex<OtaManager>>;

impl OtaPort for SharedOta {
    fn handle(&mut self) {
        self.lock().unwrap_or_else(PoisonError::into_inner).handle();
    }

    fn in_progress(&self) -> bool {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_progress()
    }
}

// ── Boot validation ───────────────────────────────────────────

/// Check OTA image state on startup and mark this firmware as valid.
///
/// Without this, the rollback watchdog reverts to the previous firmware
/// after three consecutive failed boots.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("OTA rollback check (simulation): skipped");
}

// ── Tests ─────────────────────────────────────────────────────
