use kcp::provider::{schema::Schema, Provider};

use crate::commands::SchemaCommand;

fn print_schema(prefix: &str, schema: &Schema) {
    for (name, attribute) in schema.iter() {
        let mut flags = Vec::new();
        if attribute.required {
            flags.push("required".to_string());
        } else if attribute.is_read_only() {
            flags.push("computed".to_string());
        } else {
            flags.push("optional".to_string());
        }
        if attribute.force_new {
            flags.push("forces replacement".to_string());
        }
        if attribute.sensitive {
            flags.push("sensitive".to_string());
        }
        if let Some(default) = &attribute.default {
            flags.push(format!("default {default}"));
        }
        println!("{prefix}{name} ({})", flags.join(", "));
        if !attribute.description.is_empty() {
            println!("{prefix}    {}", attribute.description);
        }
        if let Some(block) = attribute.block_schema() {
            print_schema(&format!("{prefix}{name}."), block);
        }
    }
}

impl SchemaCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let provider = Provider::new();
        match &self.type_name {
            None => {
                for type_name in provider.resource_types() {
                    println!("resource    {type_name}");
                }
                for type_name in provider.data_source_types() {
                    println!("data source {type_name}");
                }
            }
            Some(type_name) => {
                let schema = match provider.resource(type_name) {
                    Ok(resource) => resource.schema(),
                    Err(_) => provider.data_source(type_name)?.schema(),
                };
                print_schema("", &schema);
            }
        }
        Ok(())
    }
}
