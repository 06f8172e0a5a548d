/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{SocketAddr, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
#[cfg(unix)]
use std::path::PathBuf;
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
mod buf;
#[cfg(test)]
use buf::BufMetricsSink;

mod udp;
use udp::UdpMetricsSink;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix::UnixMetricsSink;

enum MetricsSinkIo {
    #[cfg(test)]
    Buf(BufMetricsSink),
    Udp(UdpMetricsSink),
    #[cfg(unix)]
    Unix(UnixMetricsSink),
}

impl MetricsSinkIo {
    fn send_msg(&self, buf: &[u8]) -> io::Result<usize> {
        match self {
            #[cfg(test)]
            MetricsSinkIo::Buf(b) => b.send_msg(buf),
            MetricsSinkIo::Udp(s) => s.send_msg(buf),
            #[cfg(unix)]
            MetricsSinkIo::Unix(s) => s.send_msg(buf),
        }
    }
}

/// Packs newline separated lines into datagrams of at most `cache_size` bytes.
///
/// A single line longer than `cache_size` is sent in its own datagram.
pub(crate) struct MetricsSink {
    cache_size: usize,
    buf: Vec<u8>,
    io: MetricsSinkIo,
}

impl MetricsSink {
    #[cfg(test)]
    pub(crate) fn buf_with_capacity(buf: Arc<Mutex<Vec<u8>>>, cache_size: usize) -> Self {
        MetricsSink {
            cache_size,
            buf: Vec::with_capacity(cache_size),
            io: MetricsSinkIo::Buf(BufMetricsSink::new(buf)),
        }
    }

    pub(crate) fn udp_with_capacity(
        addr: SocketAddr,
        socket: UdpSocket,
        cache_size: usize,
    ) -> Self {
        MetricsSink {
            cache_size,
            buf: Vec::with_capacity(cache_size),
            io: MetricsSinkIo::Udp(UdpMetricsSink::new(addr, socket)),
        }
    }

    #[cfg(unix)]
    pub(crate) fn unix_with_capacity(
        path: PathBuf,
        socket: UnixDatagram,
        cache_size: usize,
    ) -> Self {
        MetricsSink {
            cache_size,
            buf: Vec::with_capacity(cache_size),
            io: MetricsSinkIo::Unix(UnixMetricsSink::new(path, socket)),
        }
    }

    pub(crate) fn emit(&mut self, msg: &[u8]) -> io::Result<()> {
        if self.buf.is_empty() {
            self.buf.extend_from_slice(msg);
        } else if self.buf.len() + 1 + msg.len() > self.cache_size {
            // keep the new line even if the pending data failed to send
            let r = self.flush_buf();
            self.buf.extend_from_slice(msg);
            r?;
        } else {
            self.buf.push(b'\n');
            self.buf.extend_from_slice(msg);
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.flush_buf()
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        // drop the pending data even on error, it won't be sent later
        let r = self.io.send_msg(&self.buf);
        self.buf.clear();
        r.map(|_| ())
    }
}
