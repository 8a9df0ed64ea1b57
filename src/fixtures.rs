#[cfg(test)]
pub mod test {
    use crate::descriptor::OptionDescriptor;
    use crate::settings::OptionSettings;

    pub const PREFIX: &str = "APP_";

    /// A small server-style option table covering every setting kind.
    pub fn server_builder() -> crate::settings::OptionSettingsBuilder {
        OptionSettings::builder(PREFIX)
            .option(
                OptionDescriptor::string("host")
                    .short('H')
                    .env("HOST")
                    .config_key("server.host")
                    .default_value("localhost"),
            )
            .option(
                OptionDescriptor::port("port")
                    .short('p')
                    .env("PORT")
                    .config_key("server.port")
                    .default_value("8080"),
            )
            .option(
                OptionDescriptor::flag("verbose")
                    .short('v')
                    .env("VERBOSE")
                    .config_key("verbose"),
            )
            .option(
                OptionDescriptor::regex("user", "^[a-z_][a-z0-9_]*$")
                    .short('u')
                    .env("USER_NAME")
                    .config_key("user"),
            )
            .option(
                OptionDescriptor::uint16("workers")
                    .short('w')
                    .env("WORKERS")
                    .config_key("workers")
                    .default_value("4"),
            )
            .option(
                OptionDescriptor::path("log-dir")
                    .env("LOG_DIR")
                    .config_key("log.dir"),
            )
    }

    pub fn server_settings() -> OptionSettings {
        server_builder().build().unwrap()
    }

    pub fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    pub fn env(list: &[&str]) -> Vec<String> {
        args(list)
    }

    #[test]
    fn server_settings_build() {
        let settings = server_settings();
        let names: Vec<&str> = settings.descriptors().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec!["config", "host", "port", "verbose", "user", "workers", "log-dir"]
        );
    }
}
