use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

// The kernel `usbtmc` driver exposes each instrument as `/dev/usbtmcN`; one `read()` returns
// at most one device message, continuing it on the next call.
pub fn usbtmc_devices(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut devices = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_str().is_some_and(|name| name.starts_with("usbtmc")) {
            devices.push(entry.path());
        }
    }
    devices.sort();
    Ok(devices)
}

pub fn open_usbtmc(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}
