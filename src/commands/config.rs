use super::AppContext;
use crate::cli::ConfigCommand;

pub fn run(ctx: &mut AppContext, command: ConfigCommand) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("配置文件: {}", ctx.layout.config_file().display());
            println!("{}", serde_json::to_string_pretty(&ctx.config)?);
            println!("上传地址: {}", ctx.config.endpoint());
        }
        ConfigCommand::Set {
            base_ip,
            access_key,
            port,
            endpoint,
        } => {
            if let Some(ip) = base_ip {
                ctx.config.base_ip = ip.trim().to_string();
            }
            if let Some(key) = access_key {
                ctx.config.access_key = key.trim().to_string();
            }
            if let Some(port) = port {
                ctx.config.port = port;
            }
            if let Some(endpoint) = endpoint {
                // 空字符串表示清除覆盖
                ctx.config.endpoint = Some(endpoint).filter(|e| !e.is_empty());
            }

            ctx.config.save(&ctx.layout.config_file())?;
            println!("配置已保存");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BeamConfig;
    use crate::core::layout::StickLayout;

    #[test]
    fn test_set_persists_to_stick() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = AppContext::new(StickLayout::new(dir.path()));

        run(
            &mut ctx,
            ConfigCommand::Set {
                base_ip: Some(" 100.64.0.7 ".to_string()),
                access_key: Some("abc".to_string()),
                port: None,
                endpoint: None,
            },
        )
        .unwrap();

        let saved = BeamConfig::load(&dir.path().join("beam_config.json"));
        assert_eq!(saved.base_ip, "100.64.0.7");
        assert_eq!(saved.endpoint(), "http://100.64.0.7:8080/api/upload");
    }
}
