//! Dispatch-pcap capture writer.
//!
//! Hand-rolled per the documented capture file contract: a standard pcap
//! container (packet_type = custom) whose per-packet payload is this
//! crate's own record shape — {major, minor, string_count, protocol hint,
//! big-endian buffer index, NUL-terminated strings, raw packet payload}.
//! Packet payload bytes live in a collaborator's buffer pool, not in this
//! crate's `Frame` (which only ever holds packet *indices*), so the
//! dispatch loop's own call into [`DispatchCapture::record`] (gated on
//! `FrameFlags::TRACE`) always passes an empty payload slice, recording
//! node name, buffer index, and protocol hint only.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
const PCAP_VERSION_MAJOR: u16 = 2;
const PCAP_VERSION_MINOR: u16 = 4;
/// DLT_USER0: this capture's records are not a standard link-layer frame.
const LINKTYPE_USER0: u32 = 147;

/// Configuration for a capture writer.
pub struct CaptureConfig {
    /// Output file path.
    pub path: PathBuf,
    /// Stop writing records after this many packets (the file header and
    /// already-written records stay valid).
    pub max_packets: usize,
}

/// An open dispatch-pcap capture file.
pub struct DispatchCapture {
    writer: BufWriter<File>,
    max_packets: usize,
    written: usize,
}

impl DispatchCapture {
    /// Create (truncating) a capture file and write its global header.
    pub fn create(config: CaptureConfig) -> io::Result<Self> {
        let file = File::create(&config.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&PCAP_MAGIC.to_le_bytes())?;
        writer.write_all(&PCAP_VERSION_MAJOR.to_le_bytes())?;
        writer.write_all(&PCAP_VERSION_MINOR.to_le_bytes())?;
        writer.write_all(&0i32.to_le_bytes())?; // thiszone
        writer.write_all(&0u32.to_le_bytes())?; // sigfigs
        writer.write_all(&65535u32.to_le_bytes())?; // snaplen
        writer.write_all(&LINKTYPE_USER0.to_le_bytes())?;

        Ok(Self {
            writer,
            max_packets: config.max_packets,
            written: 0,
        })
    }

    /// Append one packet's capture record. A no-op once `max_packets` has
    /// been reached.
    pub fn record(&mut self, node_name: &str, buffer_index: u32, protocol_hint: u16, payload: &[u8]) -> io::Result<()> {
        if self.written >= self.max_packets {
            return Ok(());
        }

        let mut record = Vec::with_capacity(8 + node_name.len() + payload.len());
        record.push(1u8); // major
        record.push(0u8); // minor
        record.push(1u8); // string_count: node name only
        record.extend_from_slice(&protocol_hint.to_be_bytes());
        record.extend_from_slice(&buffer_index.to_be_bytes());
        record.extend_from_slice(node_name.as_bytes());
        record.push(0);
        record.extend_from_slice(payload);

        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        self.writer.write_all(&(now.as_secs() as u32).to_le_bytes())?;
        self.writer.write_all(&now.subsec_micros().to_le_bytes())?;
        self.writer.write_all(&(record.len() as u32).to_le_bytes())?;
        self.writer.write_all(&(record.len() as u32).to_le_bytes())?;
        self.writer.write_all(&record)?;

        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush buffered writes to disk.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_records() {
        let path = std::env::temp_dir().join(format!("packetgraph-capture-test-{}.pcap", std::process::id()));
        let config = CaptureConfig { path: path.clone(), max_packets: 2 };
        let mut capture = DispatchCapture::create(config).unwrap();

        capture.record("ethernet-input", 1, 0x0800, b"hello").unwrap();
        capture.record("ip4-input", 2, 0x0800, b"world").unwrap();
        capture.record("ip4-lookup", 3, 0x0800, b"dropped, over max_packets").unwrap();
        capture.flush().unwrap();

        assert_eq!(capture.written(), 2);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.len() > 24, "file should contain the global header plus records");
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), PCAP_MAGIC);

        let _ = std::fs::remove_file(&path);
    }
}
