use std::fmt::Write;

use crate::model::ArchitectureDiagram;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunService {
    pub name: String,
    pub region: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeInstance {
    pub name: String,
    pub zone: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlInstance {
    pub name: String,
    pub region: String,
    pub database_version: String,
}

/// Resources discovered in a project, grouped by product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub run_services: Vec<RunService>,
    pub instances: Vec<ComputeInstance>,
    pub sql_instances: Vec<SqlInstance>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.run_services.is_empty() && self.instances.is_empty() && self.sql_instances.is_empty()
    }
}

/// Render an inventory as a Mermaid flowchart plus a short explanation.
///
/// Service-to-database edges are inferred from co-location in the project;
/// nothing here inspects actual connections.
pub fn render_architecture(project_id: &str, inventory: &Inventory) -> ArchitectureDiagram {
    if inventory.is_empty() {
        return ArchitectureDiagram::NothingFound {
            message: format!(
                "No Cloud Run services, Compute Engine instances or Cloud SQL instances found in project {project_id}."
            ),
        };
    }

    let mut out = String::from("graph TD\n");
    let has_frontends = !inventory.run_services.is_empty() || !inventory.instances.is_empty();
    if has_frontends {
        out.push_str("    users([Users])\n");
    }

    let mut frontends = Vec::new();
    if !inventory.run_services.is_empty() {
        out.push_str("    subgraph run[Cloud Run]\n");
        for (idx, service) in inventory.run_services.iter().enumerate() {
            let id = format!("run{idx}");
            let _ = writeln!(
                out,
                "        {id}[\"{}<br/>{}\"]",
                mermaid_label(&service.name),
                mermaid_label(&service.region)
            );
            frontends.push(id);
        }
        out.push_str("    end\n");
    }
    if !inventory.instances.is_empty() {
        out.push_str("    subgraph gce[Compute Engine]\n");
        for (idx, instance) in inventory.instances.iter().enumerate() {
            let id = format!("vm{idx}");
            let _ = writeln!(
                out,
                "        {id}[\"{}<br/>{} ({})\"]",
                mermaid_label(&instance.name),
                mermaid_label(&instance.zone),
                mermaid_label(&instance.status)
            );
            frontends.push(id);
        }
        out.push_str("    end\n");
    }

    let mut databases = Vec::new();
    if !inventory.sql_instances.is_empty() {
        out.push_str("    subgraph sql[Cloud SQL]\n");
        for (idx, instance) in inventory.sql_instances.iter().enumerate() {
            let id = format!("db{idx}");
            let _ = writeln!(
                out,
                "        {id}[(\"{}<br/>{}\")]",
                mermaid_label(&instance.name),
                mermaid_label(&instance.database_version)
            );
            databases.push(id);
        }
        out.push_str("    end\n");
    }

    for frontend in &frontends {
        let _ = writeln!(out, "    users --> {frontend}");
        for database in &databases {
            let _ = writeln!(out, "    {frontend} -.-> {database}");
        }
    }

    let explanation = format!(
        "Project {project_id} contains {} Cloud Run service(s), {} Compute Engine instance(s) and {} Cloud SQL instance(s). Dashed edges are inferred from co-location and may not reflect real connections.",
        inventory.run_services.len(),
        inventory.instances.len(),
        inventory.sql_instances.len()
    );

    ArchitectureDiagram::Rendered {
        diagram: out,
        explanation,
    }
}

fn mermaid_label(raw: &str) -> String {
    raw.replace('"', "'")
}
