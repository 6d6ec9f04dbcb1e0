//! # Session identity.
//!
//! Every supervisor owns two identifiers shared with its child through the environment:
//! - a **session prefix** ([`generate_prefix`]) tagging packet lines on stdio;
//! - a **virtual address** ([`random_public_ipv4`]) the child uses to reach the parent.
//!
//! Addresses are drawn uniformly at random and retried until they are neither bogons
//! nor private-use. Two live supervisors may draw the same address; each only uses
//! its own address inside its own netstack.

use std::net::Ipv4Addr;

use rand::Rng;
use uuid::Uuid;

/// Environment variable carrying the session prefix.
pub const PREFIX_ENV: &str = "PACKET_PREFIX";

/// Environment variable carrying the parent's virtual address (dotted decimal).
pub const ADDRESS_ENV: &str = "PARENT_ADDRESS";

const PREFIX_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz1234567890";
const PREFIX_SUFFIX_LEN: usize = 10;

/// Non-routable, reserved, private-use and special-purpose IPv4 blocks.
const BOGONS: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(100, 64, 0, 0), 10),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 0, 0, 0), 24),
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(192, 88, 99, 0), 24),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    (Ipv4Addr::new(224, 0, 0, 0), 4),
    (Ipv4Addr::new(240, 0, 0, 0), 4),
];

/// Returns a fresh session prefix: a v4 UUID, a dash and 10 random alphanumerics.
pub fn generate_prefix() -> String {
    let mut rng = rand::rng();
    let mut prefix = Uuid::new_v4().hyphenated().to_string();
    prefix.push('-');
    for _ in 0..PREFIX_SUFFIX_LEN {
        let idx = rng.random_range(0..PREFIX_CHARS.len());
        prefix.push(char::from(PREFIX_CHARS[idx]));
    }
    prefix
}

/// Returns `true` if `ip` lies in a bogon or private-use block.
pub fn is_bogon(ip: Ipv4Addr) -> bool {
    let bits = u32::from(ip);
    BOGONS.iter().any(|&(net, len)| {
        let mask = u32::MAX << (32 - u32::from(len));
        bits & mask == u32::from(net) & mask
    })
}

/// Draws a uniformly random publicly-routable IPv4 address.
pub fn random_public_ipv4() -> Ipv4Addr {
    let mut rng = rand::rng();
    loop {
        let ip = Ipv4Addr::from(rng.random::<u32>());
        if !is_bogon(ip) {
            return ip;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_shape() {
        let prefix = generate_prefix();
        assert_eq!(prefix.len(), 36 + 1 + PREFIX_SUFFIX_LEN);
        let (uuid, suffix) = prefix.split_at(36);
        assert!(Uuid::parse_str(uuid).is_ok());
        assert!(suffix.starts_with('-'));
        assert!(suffix[1..].bytes().all(|b| b.is_ascii_alphanumeric()));
        assert!(!prefix.contains(' '));
    }

    #[test]
    fn test_prefixes_differ() {
        assert_ne!(generate_prefix(), generate_prefix());
    }

    #[test]
    fn test_bogon_ranges() {
        for ip in [
            Ipv4Addr::new(0, 1, 2, 3),
            Ipv4Addr::new(10, 9, 8, 7),
            Ipv4Addr::new(100, 127, 255, 255),
            Ipv4Addr::LOCALHOST,
            Ipv4Addr::new(169, 254, 1, 1),
            Ipv4Addr::new(172, 31, 0, 1),
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(198, 19, 0, 1),
            Ipv4Addr::new(224, 0, 0, 1),
            Ipv4Addr::BROADCAST,
        ] {
            assert!(is_bogon(ip), "{ip} should be a bogon");
        }
        for ip in [
            Ipv4Addr::new(1, 1, 1, 1),
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(100, 128, 0, 1),
            Ipv4Addr::new(172, 32, 0, 1),
            Ipv4Addr::new(223, 255, 255, 254),
        ] {
            assert!(!is_bogon(ip), "{ip} should be public");
        }
    }

    #[test]
    fn test_random_address_is_public() {
        for _ in 0..1000 {
            let ip = random_public_ipv4();
            assert!(!is_bogon(ip));
            assert!(!ip.is_private() && !ip.is_loopback() && !ip.is_multicast());
        }
    }
}
