//! Device/interface inventory adapter
//!
//! Walks the appliance inventory XML API: one call for the device list,
//! then one call per device for its interfaces. Each (device, interface)
//! pair becomes a positional row over the configured device fields
//! followed by the configured interface fields. Devices without
//! interfaces still emit a device-only row.

use std::collections::HashMap;

use serde::Deserialize;

use netharvest_core::config::EngineConfig;
use netharvest_core::datasource::ApplianceConfig;
use netharvest_core::job::InventoryQuery;
use netharvest_core::tabular;

use crate::error::{ConnectorError, Result};
use crate::http::build_client;

/// Body the interface endpoint returns for a device with no interfaces.
const NO_INTERFACES: &str = "No Interfaces Found";

#[derive(Debug, Deserialize)]
struct DeviceConfigurations {
    #[serde(rename = "DeviceConfiguration", default)]
    devices: Vec<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct InterfaceConfigurations {
    #[serde(rename = "InterfaceConfiguration", default)]
    interfaces: Vec<HashMap<String, String>>,
}

/// Fetch the inventory and return separator-delimited lines, header first.
pub async fn fetch(
    appliance: &ApplianceConfig,
    query: &InventoryQuery,
    config: &EngineConfig,
) -> Result<Vec<String>> {
    let client = build_client(appliance.verify_tls)?;
    let devices_url = format!("{}/ng1api/ncm/devices", appliance.base_url());
    tracing::info!(host = %appliance.host, "fetching device inventory");

    let response = client
        .get(&devices_url)
        .basic_auth(&appliance.username, Some(&appliance.password))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(ConnectorError::Status {
            status: response.status().as_u16(),
            url: devices_url,
        });
    }
    let listing: DeviceConfigurations = quick_xml::de::from_str(&response.text().await?)?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for device in &listing.devices {
        let Some(device_name) = device.get("DeviceName") else {
            tracing::warn!("device without DeviceName, skipping");
            continue;
        };

        let interfaces_url = format!(
            "{}/ng1api/ncm/devices/{}/interfaces",
            appliance.base_url(),
            device_name
        );
        let response = client
            .get(&interfaces_url)
            .basic_auth(&appliance.username, Some(&appliance.password))
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::info!(
                device = %device_name,
                status = response.status().as_u16(),
                "interface query failed, skipping device"
            );
            continue;
        }
        let body = response.text().await?;
        if body.trim() == NO_INTERFACES {
            rows.push(flatten(device, None, query));
            continue;
        }
        match quick_xml::de::from_str::<InterfaceConfigurations>(&body) {
            Ok(listing) => {
                for interface in &listing.interfaces {
                    rows.push(flatten(device, Some(interface), query));
                }
            }
            Err(error) => {
                tracing::warn!(device = %device_name, %error, "undecodable interface payload");
                rows.push(flatten(device, None, query));
            }
        }
    }

    let mut header: Vec<String> = query.device_fields.clone();
    header.extend(query.interface_fields.iter().cloned());
    let blob = tabular::encode(&header, &rows, config.separator)?;
    Ok(blob.split("\r\n").map(|line| line.to_string()).collect())
}

/// Flatten one (device, interface) pair into a positional row. Fields the
/// payload does not carry stay empty; fields the job does not ask for are
/// dropped.
pub fn flatten(
    device: &HashMap<String, String>,
    interface: Option<&HashMap<String, String>>,
    query: &InventoryQuery,
) -> Vec<String> {
    let mut row = vec![String::new(); query.device_fields.len() + query.interface_fields.len()];
    for (field, value) in device {
        if let Some(index) = query.device_fields.iter().position(|name| name == field) {
            row[index] = value.clone();
        }
    }
    if let Some(interface) = interface {
        for (field, value) in interface {
            if let Some(index) = query.interface_fields.iter().position(|name| name == field) {
                row[query.device_fields.len() + index] = value.clone();
            }
        }
    }
    row
}
