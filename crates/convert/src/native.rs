//! Export through the desktop presentation app's automation interface.
//!
//! On Windows this drives PowerPoint over COM from a PowerShell script. The
//! script closes the deck and quits the application in `finally` blocks. If
//! the timeout expires first, PowerShell is killed along with the PowerPoint
//! instance it started, which runs outside PowerShell's process tree.

use crate::job::ConversionJob;
use crate::process::{run_with_timeout, terminate_pid};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use storybook_core::{Error, Result};
use tokio::process::Command;

/// PowerPoint's `ppSaveAsPDF` file format.
const PP_SAVE_AS_PDF: u32 = 32;

fn export_script() -> String {
    format!(
        r#"param([string]$Source, [string]$Destination, [string]$PidFile)
$ErrorActionPreference = 'Stop'
$before = @(Get-Process POWERPNT -ErrorAction SilentlyContinue | ForEach-Object {{ $_.Id }})
$app = New-Object -ComObject PowerPoint.Application
# Record only an instance started for this export, never one the user had open
@(Get-Process POWERPNT -ErrorAction SilentlyContinue |
    Where-Object {{ $before -notcontains $_.Id }} |
    ForEach-Object {{ $_.Id }}) | Set-Content -Path $PidFile
try {{
    # ReadOnly, Untitled = false, WithWindow = false
    $deck = $app.Presentations.Open($Source, $true, $false, $false)
    try {{
        $deck.SaveAs($Destination, {format})
    }} finally {{
        $deck.Close()
    }}
}} finally {{
    $app.Quit()
    [void][System.Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}}
"#,
        format = PP_SAVE_AS_PDF
    )
}

/// Automation server processes recorded by the export script. Terminated on
/// drop unless the script ran to completion.
struct AutomationServer {
    pid_file: tempfile::TempPath,
    finished: bool,
}

impl AutomationServer {
    fn new() -> Result<Self> {
        let pid_file = tempfile::Builder::new()
            .prefix("storybook-server-")
            .suffix(".pid")
            .tempfile()?
            .into_temp_path();
        Ok(Self {
            pid_file,
            finished: false,
        })
    }

    fn path(&self) -> &Path {
        &self.pid_file
    }
}

impl Drop for AutomationServer {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        for pid in recorded_pids(&self.pid_file) {
            log::warn!("Terminating automation server (pid {})", pid);
            if let Err(e) = terminate_pid(pid) {
                log::error!("Failed to terminate automation server {}: {}", pid, e);
            }
        }
    }
}

fn recorded_pids(path: &Path) -> Vec<u32> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

#[derive(Debug, Clone)]
pub struct NativeAutomation {
    shell: PathBuf,
}

impl NativeAutomation {
    /// Available on Windows hosts with PowerShell.
    pub fn detect() -> Option<Self> {
        if !cfg!(windows) {
            return None;
        }
        ["powershell", "pwsh"]
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::with_shell)
    }

    /// Drive automation through a specific shell executable.
    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Export a prepared job.
    pub async fn export(&self, job: &ConversionJob) -> Result<PathBuf> {
        let mut script = tempfile::Builder::new()
            .prefix("storybook-export-")
            .suffix(".ps1")
            .tempfile()?;
        script.write_all(export_script().as_bytes())?;
        let script = script.into_temp_path();
        let mut server = AutomationServer::new()?;

        let mut cmd = Command::new(&self.shell);
        cmd.args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-File"])
            .arg(&*script)
            .arg(&job.source)
            .arg(&job.destination)
            .arg(server.path());

        // On timeout or cancellation the server is terminated when dropped
        let output = run_with_timeout(cmd, job.timeout, "PowerPoint automation").await?;
        // The script's own `finally` blocks have quit the server
        server.finished = true;
        if !output.status.success() {
            return Err(Error::ConversionFailure(format!(
                "PowerPoint automation exited with {}: {}",
                output.status,
                output.diagnostics()
            )));
        }
        if !job.destination.exists() {
            return Err(Error::ConversionFailure(format!(
                "PowerPoint automation produced no {}",
                job.destination.display()
            )));
        }

        log::info!("Converted using PowerPoint: {}", job.destination.display());
        Ok(job.destination.clone())
    }
}
