use embedded_sdmmc::{BlockDevice, Error, Mode, SdCard, TimeSource, VolumeIdx, VolumeManager};
use log::{error, warn};

use super::{BlockStore, StorageError};

/// FAT volume on an SD card, shared by the sensor log and the settings file.
///
/// Operations are blocking. Every call opens the volume, the root directory
/// and the file, does its work and closes all three again, so nothing is left
/// open across a power loss. Slow, but the device writes once a minute.
pub struct SdCardStorage<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volume_mgr: VolumeManager<D, T, 4, 4, 1>,
}

impl<D, T> SdCardStorage<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    /// Wrap any block device holding a FAT volume.
    pub fn new(device: D, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(device, ts),
        }
    }

    /// Byte-addressed view of one file in the root directory
    pub fn file<'a>(&'a self, name: &'a str) -> SdCardFile<'a, D, T> {
        SdCardFile { storage: self, name }
    }
}

impl<S, Dl, T> SdCardStorage<SdCard<S, Dl>, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    Dl: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    /// Card wired to an SPI bus, as on the board.
    pub fn on_spi(spi: S, delay: Dl, ts: T) -> Self {
        Self::new(SdCard::new(spi, delay), ts)
    }
}

/// One root-directory file on an [`SdCardStorage`]
pub struct SdCardFile<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    storage: &'a SdCardStorage<D, T>,
    name: &'a str,
}

impl<D, T> SdCardFile<'_, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    /// `None` when `offset` lies past the end of the file.
    fn read(&self, offset: u32, buf: &mut [u8]) -> Result<Option<usize>, Error<D::Error>> {
        let volume0 = self.storage.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(self.name, Mode::ReadOnly)?;

        if offset > file.length() {
            return Ok(None);
        }
        file.seek_from_start(offset)?;

        let mut filled = 0;
        while filled < buf.len() {
            let read = file.read(&mut buf[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(Some(filled))
    }

    /// `false` when `offset` lies past the end of the file.
    fn write(&self, offset: u32, data: &[u8]) -> Result<bool, Error<D::Error>> {
        let volume0 = self.storage.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(self.name, Mode::ReadWriteCreateOrAppend)?;

        if offset > file.length() {
            return Ok(false);
        }
        file.seek_from_start(offset)?;
        file.write(data)?;
        file.flush()?;

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(true)
    }

    fn length(&self) -> Result<u32, Error<D::Error>> {
        let volume0 = self.storage.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let size = match root_dir.find_directory_entry(self.name) {
            Ok(entry) => entry.size,
            Err(Error::NotFound) => 0,
            Err(e) => return Err(e),
        };

        root_dir.close()?;
        volume0.close()?;

        Ok(size)
    }
}

impl<D, T> BlockStore for SdCardFile<'_, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    fn size(&mut self) -> Result<u32, StorageError> {
        self.length().map_err(|e| sd_error(self.name, e))
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.read(offset, buf) {
            Ok(Some(read)) => Ok(read),
            Ok(None) => Err(StorageError::InvalidOffset(offset)),
            Err(e) => Err(sd_error(self.name, e)),
        }
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        match self.write(offset, data) {
            Ok(true) => Ok(()),
            Ok(false) => Err(StorageError::InvalidOffset(offset)),
            Err(e) => Err(sd_error(self.name, e)),
        }
    }
}

fn sd_error<E: core::fmt::Debug>(name: &str, e: Error<E>) -> StorageError {
    match e {
        Error::DeviceError(inner) => {
            error!("SD card device error on {}: {:?}", name, inner);
            StorageError::Unavailable
        }
        other => {
            warn!("SD card filesystem error on {}: {:?}", name, other);
            StorageError::Io
        }
    }
}
