use crate::model::{ErrorsEnvelope, PackageStatus, BLOCKED};
use crate::policy::parse_block;
use crate::url::{Locator, PackageRef};
use crate::{CurationError, Result};
use depwarden_http::{HttpClient, HttpResponse};
use depwarden_protocol::Provenance;

/// Asks the repository whether single packages may be downloaded.
#[derive(Debug, Clone)]
pub struct Prober {
    http: HttpClient,
    locator: Locator,
    provenance: Provenance,
}

impl Prober {
    pub fn new(http: HttpClient, locator: Locator) -> Self {
        Self {
            http,
            locator,
            provenance: Provenance::default(),
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// `Ok(None)` for an allowed package or a 403 the curation service did
    /// not issue.
    pub async fn probe(&self, id: &str) -> Result<Option<PackageStatus>> {
        let package = self.locator.locate(id)?;
        let head = self.http.head(&package.url).await?;
        match head.status {
            200..=299 => Ok(None),
            403 => self.blocked_details(&package).await,
            status => Err(failure("HEAD", &package, status)),
        }
    }

    /// HEAD carries no body, so the reason is fetched with a GET.
    async fn blocked_details(&self, package: &PackageRef) -> Result<Option<PackageStatus>> {
        let get = self.http.get(&package.url).await?;
        if get.status != 403 {
            if get.is_success() {
                return Ok(None);
            }
            return Err(failure("GET", package, get.status));
        }
        let envelope = decode(&get)?;
        if envelope.errors.is_empty() {
            return Err(CurationError::UnknownForbidden {
                url: package.url.clone(),
                name: package.name.clone(),
                version: package.version.clone(),
            });
        }
        let Some((reason, policies)) = parse_block(&envelope) else {
            log::debug!("{} is forbidden outside of curation", package.url);
            return Ok(None);
        };
        Ok(Some(PackageStatus {
            action: BLOCKED.to_string(),
            blocked_package_url: package.url.clone(),
            package_name: package.name.clone(),
            package_version: package.version.clone(),
            blocking_reason: reason,
            package_type: self.locator.technology().package_type().to_string(),
            policies,
            provenance: self.provenance.clone(),
            ..PackageStatus::default()
        }))
    }
}

fn decode(response: &HttpResponse) -> Result<ErrorsEnvelope> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ErrorsEnvelope::default());
    }
    Ok(response.json()?)
}

fn failure(method: &'static str, package: &PackageRef, status: u16) -> CurationError {
    CurationError::Probe {
        method,
        url: package.url.clone(),
        name: package.name.clone(),
        version: package.version.clone(),
        status,
    }
}
