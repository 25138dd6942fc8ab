use crate::HealthRes;

/// Health service shared by the REST API and the CLI.
#[derive(Clone)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static health check; preferred over instantiating the service.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "DRC analyser is alive".into(),
        }
    }

    pub fn check_health_instance(&self) -> HealthRes {
        Self::check_health()
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_alive() {
        let res = HealthService::default().check_health_instance();
        assert!(res.ok);
        assert_eq!(res, HealthService::check_health());
    }
}
