include!(concat!(env!("OUT_DIR"), "/shader_constants.rs"));

// Include generated shader source by specifying a path relative to the shader
// source directory.
#[macro_export]
macro_rules! include_shader {
    ($path:literal) => {
        include_str!(concat!(env!("OUT_DIR"), "/shaders/", $path))
    };
}

/// Number of work groups needed to give every particle its own invocation.
pub fn work_groups_for(particles: u32) -> u32 {
    ((particles as u64 + WORKGROUP_SIZE as u64 - 1) / WORKGROUP_SIZE as u64) as u32
}
