//! Command execution and frame formatting.

use bytes::Bytes;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use blewire_client::{Client, DeviceDescriptor, LoopbackTransport};
use blewire_protocol::{Frame, Message, Notification, NotifyEvent, Request};

/// Parses the payload argument: hex string, literal text, or empty.
pub fn parse_payload(
    hex_arg: Option<&str>,
    text_arg: Option<&str>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match (hex_arg, text_arg) {
        (Some(hex_str), _) => Ok(hex::decode(hex_str)?),
        (None, Some(text)) => Ok(text.as_bytes().to_vec()),
        (None, None) => Ok(Vec::new()),
    }
}

/// Formats a scan result the way the device list is usually printed.
pub fn format_devices(devices: &[DeviceDescriptor]) -> String {
    if devices.is_empty() {
        return "No devices discovered".yellow().to_string();
    }

    let mut output = String::from("Discovered devices:\n");
    for device in devices {
        output.push_str(&format!(
            "  Name: {}, ID: {}, Address: {}, Signal Strength: {} dBm\n",
            device.name.cyan(),
            device.id,
            device.address,
            device.signal_strength
        ));
    }
    output
}

/// Scans and connects to the device advertising `name`.
pub async fn connect_by_name(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let devices = client.scan(Duration::from_secs(1)).await?;
    let device = devices
        .iter()
        .find(|d| d.name == name)
        .ok_or_else(|| format!("device {} not found", name))?;

    client.connect(&device.address).await?;
    eprintln!(
        "{} {} ({})",
        "Connected to".green(),
        device.name.cyan(),
        device.address
    );
    Ok(())
}

/// Sends one command and formats the response.
pub async fn send(
    client: &Client,
    id: Option<u8>,
    subtype: u8,
    payload: &[u8],
) -> Result<String, Box<dyn std::error::Error>> {
    let response = match id {
        Some(id) => client.command(id, subtype, payload).await?,
        None => {
            let id = client.connection().next_command_id();
            client.command(id, subtype, payload).await?
        }
    };

    Ok(format!(
        "{} id={} error={}\n  Payload: {}",
        "Response".green(),
        response.id,
        response.error,
        format_bytes(&response.payload)
    ))
}

/// Waits for one notification and formats it.
pub async fn listen(
    client: &Client,
    timeout: Duration,
) -> Result<String, Box<dyn std::error::Error>> {
    let notification = client.next_notification(timeout).await?;
    Ok(format_notification(&notification))
}

/// Schedules a simulated pairing event on the loopback peripheral.
pub fn simulate_pairing_event(transport: Arc<LoopbackTransport>) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = transport.push_notification(Notification {
            id: 0,
            event: NotifyEvent::PairingOk,
            payload: Bytes::new(),
        });
    });
}

/// Encodes a request frame and renders it as hex.
pub fn encode_frame(
    id: u8,
    subtype: u8,
    payload: &[u8],
) -> Result<String, Box<dyn std::error::Error>> {
    let message = Message::Request(Request {
        id,
        subtype,
        payload: Bytes::copy_from_slice(payload),
    });
    let encoded = Frame::encode(&message)?;
    Ok(format!(
        "{} ({} bytes)\n  {}",
        "Encoded frame".green(),
        encoded.len(),
        hex::encode(&encoded)
    ))
}

/// Decodes a hex frame and renders its fields.
pub fn decode_frame(hex_frame: &str) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = hex::decode(hex_frame.trim())?;
    let frame = Frame::decode(&bytes)?;

    let body = match &frame.message {
        Message::Request(r) => format!(
            "{}\n  id: {}\n  subtype: {}\n  Payload: {}",
            "Request".bold(),
            r.id,
            r.subtype,
            format_bytes(&r.payload)
        ),
        Message::Response(r) => format!(
            "{}\n  id: {}\n  error: {}\n  Payload: {}",
            "Response".bold(),
            r.id,
            r.error,
            format_bytes(&r.payload)
        ),
        Message::Notification(n) => format_notification(n),
    };

    Ok(format!(
        "{}\n  Checksum: {:#04x} (valid)",
        body, frame.checksum
    ))
}

fn format_notification(notification: &Notification) -> String {
    format!(
        "{}\n  id: {}\n  event: {:?}\n  Payload: {}",
        "Notification".bold(),
        notification.id,
        notification.event,
        format_bytes(&notification.payload)
    )
}

fn format_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        "(empty)".dimmed().to_string()
    } else {
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(None, None).unwrap(), Vec::<u8>::new());
        assert_eq!(parse_payload(Some("4250"), None).unwrap(), vec![0x42, 0x50]);
        assert_eq!(
            parse_payload(None, Some("BP")).unwrap(),
            vec![0x42, 0x50]
        );
        assert!(parse_payload(Some("zz"), None).is_err());
    }

    #[test]
    fn test_encode_decode_cycle() {
        let encoded = encode_frame(1, 0, b"BP123456").unwrap();
        // The hex dump sits on the second line
        let hex_dump = encoded.lines().last().unwrap().trim();
        assert_eq!(
            hex_dump,
            "200100425031323334353600000000e8"
        );

        let decoded = decode_frame(hex_dump).unwrap();
        assert!(decoded.contains("id: 1"));
        assert!(decoded.contains("4250313233343536"));
    }

    #[test]
    fn test_decode_rejects_corrupt_frame() {
        assert!(decode_frame("200100425031323334353600000000e9").is_err());
        assert!(decode_frame("0102").is_err());
    }
}
