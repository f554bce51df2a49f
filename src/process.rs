//! Field processor: environment override, required check and default fill.
//!
//! Runs once per leaf field after the merged tree has been decoded into the
//! destination. Fields are independent; every failure is collected.

use crate::bind::{BindContext, Config, Field};
use crate::env::Environment;
use crate::error::{ConvertError, FieldError, FieldErrors};
use crate::logging::Logger;

/// Applies the per-field precedence policy to a bound destination.
pub struct Processor<'p> {
    env: &'p dyn Environment,
    /// `Some` enables environment overriding; the prefix may be empty.
    env_prefix: Option<&'p str>,
    ctx: &'p BindContext,
    logger: Option<&'p Logger>,
}

impl<'p> Processor<'p> {
    pub fn new(env: &'p dyn Environment, ctx: &'p BindContext) -> Self {
        Self {
            env,
            env_prefix: None,
            ctx,
            logger: None,
        }
    }

    /// Enable environment overriding with `prefix` (may be empty).
    pub fn with_env_prefix(mut self, prefix: &'p str) -> Self {
        self.env_prefix = Some(prefix);
        self
    }

    pub fn with_logger(mut self, logger: &'p Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The environment variable consulted for a field path.
    ///
    /// `loggers[0].log_level` with prefix `app` gives `APP_LOGGERS_0_LOG_LEVEL`.
    pub fn env_key(&self, path: &str) -> String {
        let key: String = path
            .chars()
            .filter_map(|c| match c {
                '.' | '[' => Some('_'),
                ']' => None,
                c => Some(c),
            })
            .collect();
        match self.env_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, key).to_uppercase(),
            _ => key.to_uppercase(),
        }
    }

    /// Process every leaf of `cfg`.
    pub fn process<T: Config>(&self, cfg: &mut T) -> Result<(), FieldErrors> {
        let mut errs = FieldErrors::new();
        for mut field in cfg.fields(self.ctx) {
            if let Err(err) = self.process_field(&mut field) {
                errs.insert(field.path.clone(), err);
            }
        }
        if errs.is_empty() { Ok(()) } else { Err(errs) }
    }

    /// Process a single leaf.
    pub fn process_field(&self, field: &mut Field<'_>) -> Result<(), FieldError> {
        if field.required && field.default.is_some() {
            return Err(FieldError::RequiredAndDefault);
        }

        if self.env_prefix.is_some() {
            let key = self.env_key(&field.path);
            if let Some(raw) = self.env.var(&key) {
                field
                    .value
                    .set_from_str(&raw, self.ctx)
                    .map_err(|source| FieldError::Env {
                        key: key.clone(),
                        source,
                    })?;
                if let Some(logger) = self.logger {
                    logger.debug(&format!("{} set from env {}", field.path, key));
                }
            }
        }

        if field.required && field.is_zero() {
            return Err(FieldError::Required);
        }

        if let Some(default) = field.default {
            if field.is_zero() {
                if !field.value.accepts_default() {
                    return Err(FieldError::Default(ConvertError::Unsupported("bool")));
                }
                field
                    .value
                    .set_from_str(default, self.ctx)
                    .map_err(FieldError::Default)?;
            }
        }

        Ok(())
    }
}
