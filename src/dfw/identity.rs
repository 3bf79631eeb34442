use std::collections::BTreeSet;

use crate::constants::RULE_NAME_SEPARATOR;
use crate::workload::Workload;

/// Display name of the rule created for one security group on one VM NIC
///
/// `{security_group_id} - {security_group_name} - {vm_id} - {deploy_id} - {network_id}`
pub fn rule_name(
    security_group_id: &str,
    security_group_name: &str,
    vm_id: &str,
    deploy_id: &str,
    network_id: &str,
) -> String {
    [
        security_group_id,
        security_group_name,
        vm_id,
        deploy_id,
        network_id,
    ]
    .join(RULE_NAME_SEPARATOR)
}

/// Names of every rule this integration would have created for the workload
///
/// One name per NIC, per security group the NIC belongs to, per rule entry
/// tagged with that group. Entries sharing a group collapse into one name.
pub fn derive_rule_names(workload: &Workload) -> BTreeSet<String> {
    workload
        .nics
        .iter()
        .flat_map(|nic| {
            nic.security_groups.iter().flat_map(move |group_id| {
                workload.rules_for_group(group_id).map(move |entry| {
                    rule_name(
                        &entry.security_group_id,
                        &entry.security_group_name,
                        &workload.vm_id,
                        &workload.deploy_id,
                        &nic.network_id,
                    )
                })
            })
        })
        .collect()
}
