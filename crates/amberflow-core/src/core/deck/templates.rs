//! Stage deck templates. Placeholders are `{key}`; see [`super::template::render`].

pub const PREP: &str = "\
# Force field and solvent parameters
source {force_field_source}
source {water_source}

mol = loadpdb \"{structure_path}\"
check mol

solvatebox mol {solvent_box} {box_buffer}

# Neutralize the system
addIons2 mol Na+ 0
addIons2 mol Cl- 0

saveamberparm mol {topology} {coordinates}
savepdb mol {solvated_structure}

quit
";

pub const MIN_RESTRAINED: &str = "\
Minimization with heavy-atom restraints from {source_coordinates}
 &cntrl
   imin=1,
   maxcyc={max_cycles},
   ncyc={steepest_descent_cycles},
   ntb=1,
   ntr=1,
   restraint_wt={restraint_weight},
   restraintmask='{restraint_mask}',
   cut={cutoff},
   ntpr=100,
 /
";

pub const MIN_FREE: &str = "\
Minimization without restraints from {source_coordinates}
 &cntrl
   imin=1,
   maxcyc={max_cycles},
   ncyc={steepest_descent_cycles},
   ntb=1,
   ntr=0,
   cut={cutoff},
   ntpr=100,
 /
";

pub const HEAT_NVT: &str = "\
Heating from 0 to {temperature} K from {source_coordinates}
 &cntrl
   imin=0,
   irest=0,
   ntx=1,
   ntb=1,
   cut={cutoff},
   ntr=1,
   restraint_wt={restraint_weight},
   restraintmask='{restraint_mask}',
   nstlim={nstlim},
   dt={timestep},
   ntc=2,
   ntf=2,
   tempi=0.0,
   temp0={temperature},
   ntt=3,
   gamma_ln=2.0,
   ig=-1,
   ntpr=500,
   ntwx=500,
   ntwr=5000,
   iwrap=1,
   nmropt=1,
 /
 &wt type='TEMP0', istep1=0, istep2={nstlim}, value1=0.0, value2={temperature}, /
 &wt type='END' /
";

pub const EQUIL_NPT: &str = "\
Equilibration (NPT) from {source_coordinates}
 &cntrl
   imin=0,
   irest=1,
   ntx=5,
   ntb=2,
   pres0={pressure},
   ntp=1,
   taup=2.0,
   cut={cutoff},
   ntr=1,
   restraint_wt={restraint_weight},
   restraintmask='{restraint_mask}',
   nstlim={nstlim},
   dt={timestep},
   ntc=2,
   ntf=2,
   temp0={temperature},
   ntt=3,
   gamma_ln=2.0,
   ig=-1,
   ntpr=500,
   ntwx=500,
   ntwr=10000,
   iwrap=1,
 /
";

pub const PROD_NPT: &str = "\
Production (NPT) from {source_coordinates}
 &cntrl
   imin=0,
   irest=1,
   ntx=5,
   ntb=2,
   pres0={pressure},
   ntp=1,
   taup=2.0,
   cut={cutoff},
   ntr=0,
   nstlim={nstlim},
   dt={timestep},
   ntc=2,
   ntf=2,
   temp0={temperature},
   ntt=3,
   gamma_ln=2.0,
   ig=-1,
   ntpr=5000,
   ntwx=5000,
   ntwr=50000,
   iwrap=1,
   ioutfm=1,
 /
";
