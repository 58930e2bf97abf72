//! 配置校验模块
//!
//! 校验规则：
//! - 路由名非空
//! - file 路由名唯一，field 路由名唯一
//! - max_fields > 0, max_fields_size > 0
//! - disk handler 必须配置 base_path

use std::collections::HashSet;

use contracts::{ContractError, FileHandlerKind, FormBlueprint};

/// 校验 FormBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &FormBlueprint) -> Result<(), ContractError> {
    validate_limits(blueprint)?;
    validate_file_routes(blueprint)?;
    validate_field_routes(blueprint)?;
    Ok(())
}

/// 校验解析限制
fn validate_limits(blueprint: &FormBlueprint) -> Result<(), ContractError> {
    let limits = &blueprint.limits;
    if limits.max_fields == 0 {
        return Err(ContractError::config_validation(
            "limits.max_fields",
            "max_fields must be > 0",
        ));
    }
    if limits.max_fields_size == 0 {
        return Err(ContractError::config_validation(
            "limits.max_fields_size",
            "max_fields_size must be > 0",
        ));
    }
    Ok(())
}

/// 校验 file 路由
fn validate_file_routes(blueprint: &FormBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, route) in blueprint.files.iter().enumerate() {
        if route.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("files[{}].name", idx),
                "route name cannot be empty",
            ));
        }
        if !seen.insert(&route.name) {
            return Err(ContractError::config_validation(
                format!("files[name={}]", route.name),
                "duplicate file route",
            ));
        }

        // disk handler 需要输出目录
        if route.handler == FileHandlerKind::Disk {
            let base_path = route.params.get("base_path").map(|p| p.trim());
            if base_path.is_none_or(str::is_empty) {
                return Err(ContractError::config_validation(
                    format!("files[{}].params.base_path", route.name),
                    "disk handler requires base_path",
                ));
            }
        }
    }
    Ok(())
}

/// 校验 field 路由
fn validate_field_routes(blueprint: &FormBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, route) in blueprint.fields.iter().enumerate() {
        if route.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("fields[{}].name", idx),
                "route name cannot be empty",
            ));
        }
        if !seen.insert(&route.name) {
            return Err(ContractError::config_validation(
                format!("fields[name={}]", route.name),
                "duplicate field route",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ConfigVersion, FieldHandlerKind, FieldRouteConfig, FileRouteConfig, MultipartConfig,
    };
    use std::collections::HashMap;

    fn minimal_blueprint() -> FormBlueprint {
        FormBlueprint {
            version: ConfigVersion::V1,
            limits: MultipartConfig::default(),
            files: vec![
                FileRouteConfig {
                    name: "avatar".into(),
                    handler: FileHandlerKind::Disk,
                    params: HashMap::from([("base_path".into(), "/tmp/uploads".into())]),
                },
                FileRouteConfig {
                    name: "*".into(),
                    handler: FileHandlerKind::Log,
                    params: Default::default(),
                },
            ],
            fields: vec![FieldRouteConfig {
                name: "*".into(),
                handler: FieldHandlerKind::Collect,
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_empty_blueprint_is_valid() {
        assert!(validate(&FormBlueprint::default()).is_ok());
    }

    #[test]
    fn test_duplicate_file_route() {
        let mut bp = minimal_blueprint();
        bp.files.push(bp.files[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate file route"), "got: {err}");
    }

    #[test]
    fn test_duplicate_field_route() {
        let mut bp = minimal_blueprint();
        bp.fields.push(bp.fields[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate field route"), "got: {err}");
    }

    #[test]
    fn test_same_name_for_file_and_field_is_allowed() {
        let mut bp = minimal_blueprint();
        bp.fields.push(FieldRouteConfig {
            name: "avatar".into(),
            handler: FieldHandlerKind::Log,
        });
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_zero_max_fields() {
        let mut bp = minimal_blueprint();
        bp.limits.max_fields = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("max_fields must be > 0"), "got: {err}");
    }

    #[test]
    fn test_zero_max_fields_size() {
        let mut bp = minimal_blueprint();
        bp.limits.max_fields_size = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("max_fields_size"), "got: {err}");
    }

    #[test]
    fn test_disk_route_without_base_path() {
        let mut bp = minimal_blueprint();
        bp.files[0].params.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("requires base_path"), "got: {err}");
    }

    #[test]
    fn test_empty_route_name() {
        let mut bp = minimal_blueprint();
        bp.fields[0].name = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
