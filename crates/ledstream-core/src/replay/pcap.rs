use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapNGReader, traits::PcapReaderIterator,
};

use super::ReplayError;

const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
const READER_BUFFER_SIZE: usize = 65_536;

/// One captured link-layer packet with its capture timestamp in seconds.
pub(crate) struct CapturePacket {
    pub ts: Option<f64>,
    pub linktype: Linktype,
    pub data: Vec<u8>,
}

/// Iterates packets out of a PCAP or PCAPNG file.
pub(crate) struct CaptureReader {
    inner: Reader,
}

enum Reader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktypes: Vec<Linktype>,
    },
}

impl CaptureReader {
    pub(crate) fn open(path: &Path) -> Result<Self, ReplayError> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;

        let inner = if magic == PCAPNG_MAGIC {
            let reader =
                PcapNGReader::new(READER_BUFFER_SIZE, file).map_err(|e| ReplayError::Capture {
                    context: "pcapng reader init",
                    message: e.to_string(),
                })?;
            Reader::Ng {
                reader,
                linktypes: Vec::new(),
            }
        } else {
            let reader =
                LegacyPcapReader::new(READER_BUFFER_SIZE, file).map_err(|e| ReplayError::Capture {
                    context: "pcap reader init",
                    message: e.to_string(),
                })?;
            Reader::Legacy {
                reader,
                linktype: None,
            }
        };
        Ok(Self { inner })
    }

    pub(crate) fn next_packet(&mut self) -> Result<Option<CapturePacket>, ReplayError> {
        loop {
            match &mut self.inner {
                Reader::Legacy { reader, linktype } => match reader.next() {
                    Ok((offset, block)) => {
                        let packet = match block {
                            PcapBlockOwned::LegacyHeader(header) => {
                                *linktype = Some(header.network);
                                None
                            }
                            PcapBlockOwned::Legacy(packet) => Some(CapturePacket {
                                ts: Some(
                                    packet.ts_sec as f64 + (packet.ts_usec as f64 * 1e-6),
                                ),
                                linktype: linktype.unwrap_or(Linktype::ETHERNET),
                                data: packet.data.to_vec(),
                            }),
                            _ => None,
                        };
                        reader.consume(offset);
                        if packet.is_some() {
                            return Ok(packet);
                        }
                    }
                    Err(pcap_parser::PcapError::Eof) => return Ok(None),
                    Err(pcap_parser::PcapError::Incomplete(_)) => {
                        reader.refill().map_err(|e| ReplayError::Capture {
                            context: "pcap reader refill",
                            message: e.to_string(),
                        })?;
                    }
                    Err(e) => {
                        return Err(ReplayError::Capture {
                            context: "pcap reader next",
                            message: e.to_string(),
                        });
                    }
                },
                Reader::Ng { reader, linktypes } => match reader.next() {
                    Ok((offset, block)) => {
                        let packet = match block {
                            PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                                linktypes.push(intf.linktype);
                                None
                            }
                            PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                                let ts = ((packet.ts_high as u64) << 32) | (packet.ts_low as u64);
                                Some(CapturePacket {
                                    ts: Some(ts as f64 * 1e-6),
                                    linktype: linktypes
                                        .get(packet.if_id as usize)
                                        .copied()
                                        .unwrap_or(Linktype::ETHERNET),
                                    data: packet.data.to_vec(),
                                })
                            }
                            _ => None,
                        };
                        reader.consume(offset);
                        if packet.is_some() {
                            return Ok(packet);
                        }
                    }
                    Err(pcap_parser::PcapError::Eof) => return Ok(None),
                    Err(pcap_parser::PcapError::Incomplete(_)) => {
                        reader.refill().map_err(|e| ReplayError::Capture {
                            context: "pcapng reader refill",
                            message: e.to_string(),
                        })?;
                    }
                    Err(e) => {
                        return Err(ReplayError::Capture {
                            context: "pcapng reader next",
                            message: e.to_string(),
                        });
                    }
                },
            }
        }
    }
}
