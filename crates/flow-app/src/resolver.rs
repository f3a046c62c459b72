//! Target Resolver
//!
//! Reconciles the optional `--flavor` / `--device` selectors with the flavor
//! registry and freshly discovered devices. Resolution never guesses: when
//! several candidates remain and nothing disambiguates them, it fails with
//! the list of choices.

use flow_core::prelude::*;
use flow_core::{Device, Platform, TargetKind};
use serde::Serialize;

use crate::dispatch::Action;
use crate::flavors::{Flavor, FlavorRegistry};

/// What the command line asked for, before resolution
#[derive(Debug, Clone)]
pub struct TargetRequest {
    /// `None` for platform-independent actions (and releases to both stores)
    pub platform: Option<Platform>,
    pub flavor: Option<String>,
    pub device: Option<String>,
    pub action: Action,
}

/// A fully resolved flavor/device/action combination, ready for dispatch
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTarget {
    /// `None` builds the project's unflavored default
    pub flavor: Option<Flavor>,
    /// Only set for actions that run against a device
    pub device: Option<Device>,
    pub platform: Option<Platform>,
    pub action: Action,
}

pub struct TargetResolver<'a> {
    registry: &'a FlavorRegistry,
    default_flavor: Option<String>,
}

impl<'a> TargetResolver<'a> {
    pub fn new(registry: &'a FlavorRegistry) -> Self {
        Self {
            registry,
            default_flavor: None,
        }
    }

    /// Flavor to use when no `--flavor` is given (`general.default_flavor`)
    pub fn with_default_flavor(mut self, name: Option<&str>) -> Self {
        self.default_flavor = name.map(str::to_string);
        self
    }

    /// Pick the flavor for this invocation.
    ///
    /// An explicit selector must name a valid flavor. Without one, the
    /// configured default is used when it exists; otherwise a registry with
    /// no flavors means the unflavored build and a single valid flavor is
    /// selected automatically.
    pub fn resolve_flavor(&self, selector: Option<&str>) -> Result<Option<Flavor>> {
        if let Some(name) = selector {
            return self.registry.get(name).cloned().map(Some);
        }

        if let Some(name) = &self.default_flavor {
            if self.registry.names().contains(name) {
                debug!("Using default flavor '{}'", name);
                return self.registry.get(name).cloned().map(Some);
            }
            warn!(
                "Default flavor '{}' is not a valid flavor of this project; ignoring it",
                name
            );
        }

        let valid: Vec<&Flavor> = self.registry.flavors().collect();
        match valid.as_slice() {
            [] => {
                self.registry.ensure_valid()?;
                Ok(None)
            }
            [only] => {
                debug!("Auto-selected flavor '{}'", only.name);
                Ok(Some((*only).clone()))
            }
            _ => Err(Error::TargetAmbiguous {
                kind: TargetKind::Flavor,
                selector: None,
                choices: self.registry.names(),
            }),
        }
    }

    /// Resolve a request against the devices discovered for this invocation
    pub fn resolve(&self, request: TargetRequest, devices: &[Device]) -> Result<ResolvedTarget> {
        let flavor = self.resolve_flavor(request.flavor.as_deref())?;

        let device = if request.action.needs_device() {
            let platform = request.platform.ok_or_else(|| {
                Error::config(format!("{} requires a target platform", request.action.name()))
            })?;
            Some(select_device(devices, platform, request.device.as_deref())?)
        } else {
            if let Some(selector) = &request.device {
                debug!("Ignoring device '{}' for {}", selector, request.action.name());
            }
            None
        };

        Ok(ResolvedTarget {
            flavor,
            device,
            platform: request.platform,
            action: request.action,
        })
    }
}

/// Choose one device of `platform`.
///
/// Without a selector exactly one available device must exist. A selector
/// matches by exact id, then case-insensitive exact name, then
/// case-insensitive name substring.
pub fn select_device(devices: &[Device], platform: Platform, selector: Option<&str>) -> Result<Device> {
    let candidates: Vec<&Device> = devices.iter().filter(|d| d.platform == platform).collect();

    let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
        return auto_select(&candidates, platform);
    };

    let device = match_selector(&candidates, selector)?;
    if device.is_available() || device.needs_boot() {
        info!("Selected device {}", device.label());
        return Ok(device.clone());
    }

    Err(Error::TargetNotFound {
        kind: TargetKind::Device,
        selector: selector.to_string(),
        reason: Some(
            device
                .state
                .clone()
                .unwrap_or_else(|| device.readiness.to_string()),
        ),
        choices: candidates
            .iter()
            .filter(|d| d.is_available() || d.needs_boot())
            .map(|d| d.label())
            .collect(),
    })
}

fn auto_select(candidates: &[&Device], platform: Platform) -> Result<Device> {
    let available: Vec<&Device> = candidates.iter().copied().filter(|d| d.is_available()).collect();
    match available.as_slice() {
        [] => Err(Error::NoDevices { platform }),
        [only] => {
            info!("Auto-selected device {}", only.label());
            Ok((*only).clone())
        }
        _ => Err(Error::TargetAmbiguous {
            kind: TargetKind::Device,
            selector: None,
            choices: labels(&available),
        }),
    }
}

fn match_selector<'d>(candidates: &[&'d Device], selector: &str) -> Result<&'d Device> {
    if let Some(device) = candidates.iter().find(|d| d.id == selector) {
        return Ok(*device);
    }

    let wanted = selector.to_lowercase();
    let by_name: Vec<&Device> = candidates
        .iter()
        .copied()
        .filter(|d| d.name.to_lowercase() == wanted)
        .collect();
    if !by_name.is_empty() {
        return single(by_name, selector);
    }

    let partial: Vec<&Device> = candidates
        .iter()
        .copied()
        .filter(|d| d.name.to_lowercase().contains(&wanted))
        .collect();
    if partial.is_empty() {
        return Err(Error::TargetNotFound {
            kind: TargetKind::Device,
            selector: selector.to_string(),
            reason: None,
            choices: labels(candidates),
        });
    }
    single(partial, selector)
}

fn single<'d>(matches: Vec<&'d Device>, selector: &str) -> Result<&'d Device> {
    match matches.as_slice() {
        [only] => Ok(*only),
        _ => Err(Error::TargetAmbiguous {
            kind: TargetKind::Device,
            selector: Some(selector.to_string()),
            choices: labels(&matches),
        }),
    }
}

fn labels(devices: &[&Device]) -> Vec<String> {
    devices.iter().map(|d| d.label()).collect()
}
