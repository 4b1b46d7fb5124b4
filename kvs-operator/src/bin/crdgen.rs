// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use kvs_operator_controller::crd::utils::generate_crds;

fn main() -> anyhow::Result<()> {
    generate_crds()?;
    Ok(())
}
