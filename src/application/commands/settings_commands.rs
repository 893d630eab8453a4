// src/application/commands/settings_commands.rs

use crate::application::error_handling::{ErrorResponse, ToErrorResponse};
use crate::application::{dto::*, state::AppState};
use crate::config::{keys, DEFAULT_OPTIONS};
use crate::repositories::ConfigProvider;
use crate::services::ConnectionTestResult;

const SECRET_OPTIONS: [&str; 2] = [keys::API_KEY, keys::API_SECRET];

fn is_known_option(name: &str) -> bool {
    SECRET_OPTIONS.contains(&name) || DEFAULT_OPTIONS.iter().any(|(key, _)| *key == name)
}

fn mask(name: &str, value: &str) -> String {
    if !SECRET_OPTIONS.contains(&name) || value.is_empty() {
        return value.to_string();
    }
    let tail: String = value
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", tail)
}

fn validate_value(name: &str, value: &str) -> Result<(), String> {
    let ok = match name {
        keys::DEMO_MODE | keys::SANDBOX_MODE | keys::AUTO_GENERATE | keys::SEND_EMAIL => {
            matches!(value, "yes" | "no")
        }
        keys::TASA_IVA => value
            .trim()
            .parse::<f64>()
            .map(|rate| (0.0..1.0).contains(&rate))
            .unwrap_or(false),
        keys::AUTO_GENERATE_DELAY_SECS => value.trim().parse::<u64>().is_ok(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("Invalid value '{}' for {}", value, name))
    }
}

/// Check credentials before saving them; stored options are not touched
pub async fn test_connection(dto: TestConnectionDto, state: &AppState) -> ConnectionTestResult {
    state
        .connection_service
        .test_connection(&dto.api_key, &dto.api_secret, dto.sandbox)
        .await
}

pub async fn list_settings(state: &AppState) -> Result<Vec<SettingDto>, String> {
    let stored = state.options.list_all().to_error_response()?;

    let mut settings = Vec::new();
    for name in SECRET_OPTIONS
        .iter()
        .copied()
        .chain(DEFAULT_OPTIONS.iter().map(|(key, _)| *key))
    {
        let value = match stored.iter().find(|(key, _)| key == name) {
            Some((_, value)) => value.clone(),
            None => state.options.get(name, "").to_error_response()?,
        };
        settings.push(SettingDto {
            name: name.to_string(),
            value: mask(name, &value),
        });
    }
    Ok(settings)
}

pub async fn update_setting(
    name: String,
    value: String,
    state: &AppState,
) -> Result<SettingDto, String> {
    if !is_known_option(&name) {
        return Err(ErrorResponse::validation(format!("Unknown option '{}'", name)).to_json());
    }
    validate_value(&name, &value).map_err(|e| ErrorResponse::validation(e).to_json())?;

    state.options.set(&name, value.trim()).to_error_response()?;
    log::info!("Option {} updated", name);

    Ok(SettingDto {
        value: mask(&name, value.trim()),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::integrations::facturacom::transport::MockHttpTransport;
    use std::sync::Arc;

    fn state() -> AppState {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();
        AppState::new(Arc::new(create_test_pool().unwrap()), Arc::new(transport)).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_are_seeded_and_secrets_masked() {
        let state = state();
        update_setting(keys::API_KEY.to_string(), "sk_live_abcdef1234".to_string(), &state)
            .await
            .unwrap();

        let settings = list_settings(&state).await.unwrap();
        let get = |name: &str| {
            settings
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.value.clone())
                .unwrap()
        };
        assert_eq!(get(keys::DEMO_MODE), "yes");
        assert_eq!(get(keys::USO_CFDI), "G01");
        assert_eq!(get(keys::API_KEY), "****1234");
        assert_eq!(get(keys::API_SECRET), "");
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_and_invalid() {
        let state = state();
        assert!(update_setting("colour".to_string(), "red".to_string(), &state)
            .await
            .is_err());
        assert!(update_setting(keys::DEMO_MODE.to_string(), "maybe".to_string(), &state)
            .await
            .is_err());
        assert!(update_setting(keys::TASA_IVA.to_string(), "16".to_string(), &state)
            .await
            .is_err());

        let saved = update_setting(keys::TASA_IVA.to_string(), "0.08".to_string(), &state)
            .await
            .unwrap();
        assert_eq!(saved.value, "0.08");
        assert_eq!(state.options.get(keys::TASA_IVA, "").unwrap(), "0.08");
    }

    #[tokio::test]
    async fn test_connection_with_empty_credentials() {
        let state = state();
        let result = test_connection(
            TestConnectionDto {
                api_key: String::new(),
                api_secret: String::new(),
                sandbox: true,
            },
            &state,
        )
        .await;
        assert!(!result.success);
        assert_eq!(state.options.get(keys::API_KEY, "").unwrap(), "");
    }
}
