use etherparse::{SlicedPacket, TransportSlice};
use pcap_parser::Linktype;

/// Extract the UDP payload addressed to `port` from a link-layer frame.
///
/// Anything else (non-IP, non-UDP, other ports, truncated packets) yields
/// `None`; a capture may contain arbitrary unrelated traffic.
pub(crate) fn datagram_for_port(linktype: Linktype, data: &[u8], port: u16) -> Option<&[u8]> {
    let sliced = match linktype {
        Linktype::ETHERNET => SlicedPacket::from_ethernet(data).ok()?,
        Linktype::RAW => SlicedPacket::from_ip(data).ok()?,
        _ => return None,
    };

    let udp = match sliced.transport? {
        TransportSlice::Udp(udp) => udp,
        _ => return None,
    };
    if udp.destination_port() != port {
        return None;
    }

    // Slice the payload out of the IP layer; the UDP header is 8 bytes.
    let ip_payload = sliced.net?.ip_payload_ref()?.payload;
    ip_payload.get(8..)
}
