use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::Context;
use log::{info, warn};

use crate::config::GroupSettings;
use crate::read_sheet::read_entries;
use crate::types::{AddressGroup, MacEntry};

pub(crate) const COMMANDS_FILE: &str = "commands.conf";
pub(crate) const GROUP_MAPPING_FILE: &str = "groups.yaml";

/// Render the commands for the given sheet and store them in `output_dir`
/// without contacting the appliance.
pub(crate) fn generate(input: &str, sheet: &str, output_dir: &str) -> Result<(), anyhow::Error> {
    let settings = GroupSettings::from_env().context("Loading group settings")?;

    generate_with(&settings, input, sheet, output_dir)
}

fn generate_with(
    settings: &GroupSettings,
    input: &str,
    sheet: &str,
    output_dir: &str,
) -> Result<(), anyhow::Error> {
    let entries = read_entries(input, sheet);
    if entries.is_empty() {
        warn!("No MAC addresses found. Check the spreadsheet format.");
        return Ok(());
    }

    let groups = plan_groups(&entries, &settings.prefix, settings.max_size);
    let commands = render_commands(&entries, &groups);

    info!(
        "Generated {} address objects in {} groups",
        entries.len(),
        groups.len()
    );

    store_commands(output_dir, &commands, &groups).context("Storing commands")
}

/// Build the full command sequence: every address object first, then the
/// groups referencing them.
pub(crate) fn generate_commands(
    entries: &[MacEntry],
    prefix: &str,
    max_group_size: NonZeroUsize,
) -> Vec<String> {
    let groups = plan_groups(entries, prefix, max_group_size);
    render_commands(entries, &groups)
}

fn render_commands(entries: &[MacEntry], groups: &[AddressGroup]) -> Vec<String> {
    entries
        .iter()
        .map(address_command)
        .chain(groups.iter().map(group_command))
        .collect()
}

/// Split the entries into consecutive groups of at most `max_group_size`
/// members, named `{prefix}_1`, `{prefix}_2`, ...
pub(crate) fn plan_groups(
    entries: &[MacEntry],
    prefix: &str,
    max_group_size: NonZeroUsize,
) -> Vec<AddressGroup> {
    entries
        .chunks(max_group_size.get())
        .enumerate()
        .map(|(i, chunk)| AddressGroup {
            name: format!("{prefix}_{}", i + 1),
            members: chunk.iter().map(|entry| entry.name.clone()).collect(),
        })
        .collect()
}

// Names are not escaped. A quote inside a name breaks the command on the
// appliance, so it is only flagged here.
fn address_command(entry: &MacEntry) -> String {
    if entry.name.contains('"') {
        warn!("Address name contains a quote and will not be accepted: {}", entry.name);
    }

    format!(
        "\nconfig firewall address\nedit \"{}\"\nset type mac\nset macaddr {}\nnext\nend\n",
        entry.name, entry.mac
    )
}

fn group_command(group: &AddressGroup) -> String {
    let members = group
        .members
        .iter()
        .map(|member| format!("\"{member}\""))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "\nconfig firewall addrgrp\nedit \"{}\"\nset member {}\nnext\nend\n",
        group.name, members
    )
}

fn store_commands(
    output_dir: &str,
    commands: &[String],
    groups: &[AddressGroup],
) -> Result<(), anyhow::Error> {
    let path = Path::new(output_dir);

    fs::create_dir_all(path).with_context(|| "Creating output dir")?;

    let script: String = commands.iter().map(|command| format!("{command}\n")).collect();
    fs::write(path.join(COMMANDS_FILE), script).with_context(|| "Writing commands file")?;

    let mapping_file = fs::File::create(path.join(GROUP_MAPPING_FILE))
        .with_context(|| "Creating group mapping file")?;
    serde_yaml::to_writer(mapping_file, groups)?;

    info!("Stored commands in {:?}", path.join(COMMANDS_FILE));

    Ok(())
}
