//! Persistent storage for the pad configuration.
//!
//! Uses the nRF52840's internal flash via the `sequential-storage` crate.
//! The whole [`PadConfig`] is one versioned record under a single key;
//! `sequential-storage` appends new versions and handles wear levelling
//! and garbage collection across the reserved pages.

use adp_pad::config::{CONFIG_SAVE_DELAY_MS, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use adp_pad::{PadConfig, PadVariant};
use defmt::{error, info, warn};
use embassy_time::{Duration, Instant};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

use crate::usb::{with_engine, SharedEngine};

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Key of the configuration record.
const KEY_PAD_CONFIG: u8 = 0x01;

/// Work buffer: serialized record plus item header and key.
const ITEM_BUFFER_SIZE: usize = 256;

const _: () = assert!(PadConfig::STORED_SIZE + 16 <= ITEM_BUFFER_SIZE);

/// Configuration record in flash plus the debounce state for saving it.
pub struct ConfigStore<F> {
    flash: F,
    /// Earliest time the pending change may be written.
    save_at: Option<Instant>,
}

impl<F: NorFlash> ConfigStore<F> {
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            save_at: None,
        }
    }

    /// Load the stored configuration, if a valid one exists.
    ///
    /// Records from another layout version or that fail validation for
    /// this variant are ignored; the caller falls back to defaults.
    pub async fn load(&mut self, variant: &PadVariant) -> Option<PadConfig> {
        let mut buf = [0u8; ITEM_BUFFER_SIZE];

        match fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_PAD_CONFIG,
        )
        .await
        {
            Ok(Some(data)) => match PadConfig::from_stored(data, variant) {
                Some(config) => {
                    info!("Loaded pad configuration from flash");
                    Some(config)
                }
                None => {
                    warn!("Stored configuration rejected ({=usize} bytes)", data.len());
                    None
                }
            },
            Ok(None) => {
                info!("No pad configuration in flash");
                None
            }
            Err(e) => {
                error!("Flash read error: {:?}", defmt::Debug2Format(&e));
                None
            }
        }
    }

    /// Persist `config` immediately.
    pub async fn save(&mut self, config: &PadConfig) -> bool {
        let mut buf = [0u8; ITEM_BUFFER_SIZE];
        let mut data_buf = [0u8; PadConfig::STORED_SIZE];

        let len = config.serialize(&mut data_buf);
        if len == 0 {
            error!("Configuration does not fit its record");
            return false;
        }
        let item = &data_buf[..len];

        match store_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_PAD_CONFIG,
            &item,
        )
        .await
        {
            Ok(()) => {
                info!("Saved pad configuration ({=usize} bytes)", len);
                true
            }
            Err(e) => {
                error!("Flash write error: {:?}", defmt::Debug2Format(&e));
                false
            }
        }
    }

    /// Save the engine's configuration once writes have been quiet for
    /// `CONFIG_SAVE_DELAY_MS`. Call periodically.
    ///
    /// Bursts of writes (a host dragging a threshold slider) end up as one
    /// flash write instead of one per report.
    pub async fn sync(&mut self, engine: &SharedEngine) {
        let now = Instant::now();
        if with_engine(engine, |engine| engine.take_dirty()) {
            self.save_at = Some(now + Duration::from_millis(CONFIG_SAVE_DELAY_MS));
        }
        match self.save_at {
            Some(at) if now >= at => {
                let config = with_engine(engine, |engine| engine.state().config.clone());
                if self.save(&config).await {
                    self.save_at = None;
                } else {
                    // Retry after another delay.
                    self.save_at = Some(now + Duration::from_millis(CONFIG_SAVE_DELAY_MS));
                }
            }
            _ => {}
        }
    }
}
