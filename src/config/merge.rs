//! Merging YAML values over the environment configuration.

use std::error::Error;
use std::path::PathBuf;

use super::env::{TlsPaths, load_from_env};
use super::yaml::{
    GenerationYaml, ModelYaml, OutputYaml, SecurityYaml, ServerYaml, YamlConfig,
};
use super::{ServerConfig, TlsConfig};
use crate::core::output::OutputNaming;
use crate::core::tts::{ApiKey, ModelBackend, ModelDevice};

/// Load the environment configuration and apply YAML overrides on top.
pub(crate) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn Error>> {
    let (mut config, mut tls_paths) = load_from_env()?;
    let mut tls_enabled = true;

    if let Some(yaml) = yaml {
        if let Some(server) = yaml.server {
            apply_server(&mut config, &mut tls_paths, &mut tls_enabled, server);
        }
        if let Some(model) = yaml.model {
            apply_model(&mut config, model)?;
        }
        if let Some(generation) = yaml.generation {
            apply_generation(&mut config, generation);
        }
        if let Some(output) = yaml.output {
            apply_output(&mut config, output)?;
        }
        if let Some(security) = yaml.security {
            apply_security(&mut config, security);
        }
    }

    config.tls = if tls_enabled {
        pair_tls_paths(tls_paths)?
    } else {
        None
    };

    Ok(config)
}

fn apply_server(
    config: &mut ServerConfig,
    tls_paths: &mut TlsPaths,
    tls_enabled: &mut bool,
    server: ServerYaml,
) {
    if let Some(host) = server.host {
        config.host = host;
    }
    if let Some(port) = server.port {
        config.port = port;
    }
    if let Some(dir) = server.static_dir {
        config.static_dir = PathBuf::from(dir);
    }
    if let Some(tls) = server.tls {
        if tls.enabled == Some(false) {
            *tls_enabled = false;
        }
        if tls.cert_path.is_some() {
            tls_paths.cert_path = tls.cert_path;
        }
        if tls.key_path.is_some() {
            tls_paths.key_path = tls.key_path;
        }
    }
}

fn apply_model(config: &mut ServerConfig, model: ModelYaml) -> Result<(), Box<dyn Error>> {
    let target = &mut config.model;
    if let Some(backend) = model.backend {
        target.backend = ModelBackend::parse(&backend)?;
    }
    if model.url.is_some() {
        target.url = model.url;
    }
    if let Some(key) = model.api_key {
        target.api_key = Some(ApiKey::new(key));
    }
    if model.command.is_some() {
        target.command = model.command;
    }
    if let Some(args) = model.args {
        target.args = args;
    }
    if let Some(device) = model.device {
        target.device = ModelDevice::parse(&device)?;
    }
    if let Some(rate) = model.sample_rate {
        target.sample_rate = rate;
    }
    if let Some(timeout) = model.timeout_seconds {
        target.timeout_seconds = timeout;
    }
    Ok(())
}

fn apply_generation(config: &mut ServerConfig, generation: GenerationYaml) {
    if let Some(max) = generation.max_text_length {
        config.max_text_length = max;
    }
    if let Some(max) = generation.max_upload_bytes {
        config.max_upload_bytes = max;
    }
    if let Some(max) = generation.max_concurrent {
        config.max_concurrent_generations = max;
    }
    if let Some(dir) = generation.upload_dir {
        config.upload_dir = Some(PathBuf::from(dir));
    }
}

fn apply_output(config: &mut ServerConfig, output: OutputYaml) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = output.dir {
        config.output_dir = PathBuf::from(dir);
    }
    if let Some(naming) = output.naming {
        config.output_naming = OutputNaming::parse(&naming)?;
    }
    if output.retention_seconds.is_some() {
        config.output_retention_seconds = output.retention_seconds;
    }
    if let Some(interval) = output.sweep_interval_seconds {
        config.output_sweep_interval_seconds = interval;
    }
    Ok(())
}

fn apply_security(config: &mut ServerConfig, security: SecurityYaml) {
    if security.cors_allowed_origins.is_some() {
        config.cors_allowed_origins = security.cors_allowed_origins;
    }
    if let Some(rps) = security.rate_limit_requests_per_second {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = security.rate_limit_burst_size {
        config.rate_limit_burst_size = burst;
    }
}

fn pair_tls_paths(paths: TlsPaths) -> Result<Option<TlsConfig>, Box<dyn Error>> {
    match (paths.cert_path, paths.key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => {
            Err("TLS cert_path is set but key_path (TLS_KEY_PATH) is missing".into())
        }
        (None, Some(_)) => {
            Err("TLS key_path is set but cert_path (TLS_CERT_PATH) is missing".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::TlsYaml;
    use serial_test::serial;

    #[test]
    fn test_pair_tls_paths() {
        assert_eq!(pair_tls_paths(TlsPaths::default()).unwrap(), None);

        let paired = pair_tls_paths(TlsPaths {
            cert_path: Some("c.pem".to_string()),
            key_path: Some("k.pem".to_string()),
        })
        .unwrap()
        .unwrap();
        assert_eq!(paired.cert_path, PathBuf::from("c.pem"));

        assert!(
            pair_tls_paths(TlsPaths {
                cert_path: None,
                key_path: Some("k.pem".to_string()),
            })
            .is_err()
        );
    }

    #[test]
    #[serial]
    fn test_tls_disabled_in_yaml() {
        let yaml = YamlConfig {
            server: Some(ServerYaml {
                tls: Some(TlsYaml {
                    enabled: Some(false),
                    cert_path: Some("c.pem".to_string()),
                    key_path: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = merge_config(Some(yaml)).unwrap();
        assert!(config.tls.is_none());
    }

    #[test]
    #[serial]
    fn test_yaml_args_replace_env_args() {
        unsafe {
            std::env::set_var("MODEL_ARGS", "env.py --slow");
        }

        let yaml = YamlConfig {
            model: Some(ModelYaml {
                args: Some(vec!["yaml.py".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.model.args, vec!["yaml.py"]);

        unsafe {
            std::env::remove_var("MODEL_ARGS");
        }
    }

    #[test]
    #[serial]
    fn test_yaml_unknown_device_is_rejected() {
        let yaml = YamlConfig {
            model: Some(ModelYaml {
                device: Some("cuda0".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let err = merge_config(Some(yaml)).unwrap_err();
        assert!(err.to_string().contains("Unsupported model device: cuda0"));
    }
}
