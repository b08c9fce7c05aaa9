pub mod bvh;

pub trait Bindable {
    fn get_layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry>;
    fn get_bind_group_entries(&self) -> Vec<wgpu::BindGroupEntry>;
    fn get_bind_descriptor(&self) -> Vec<WgslBindDescriptor>;
}

pub fn create_bind_group_layouts(device: &wgpu::Device, layout_entries: Vec<Vec<wgpu::BindGroupLayoutEntry>>) -> Vec<wgpu::BindGroupLayout> {
    let mut layouts = Vec::with_capacity(layout_entries.len());
    for entries in layout_entries {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: entries.as_ref(),
            label: None,
        });
        layouts.push(layout);
    }
    layouts
}

pub fn create_bind_groups(device: &wgpu::Device, bind_group_entries: Vec<Vec<wgpu::BindGroupEntry>>, bind_group_layouts: &[wgpu::BindGroupLayout]) -> Vec<wgpu::BindGroup> {
    let mut bind_groups = Vec::new();

    for (entries, layout) in bind_group_entries.iter().zip(bind_group_layouts) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries,
            label: None,
        });
        bind_groups.push(bind_group);
    }
    bind_groups
}

pub struct WgslBindDescriptor<'a> {
    pub struct_def: Option<&'a str>,
    pub bind_type: Option<&'a str>,
    pub var_name: &'a str,
    pub var_type: &'a str,
    pub extra_code: Option<&'a str>,
}

pub fn generate_wgsl_string(
    struct_def: Option<&str>,
    bind_type: &str,
    var_name: &str,
    var_type: &str,
    group_id: u32,
    binding_id: u32,
    extra_code: Option<&str>,
) -> String {
    format!("
    {}\n
    @group({group_id}) @binding({binding_id})\n
    var<{bind_type}> {var_name}: {var_type};\n
    {}\n",
    struct_def.unwrap_or(""),
    extra_code.unwrap_or(""))
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn example() {
        let struct_def =
"struct Aabb {
    min: vec3f,
    _padding: f32,
    max: vec3f,
    _padding2: f32,
};";

        let bind_type = "uniform";
        let var_name = "aabb";
        let var_type = "Aabb";
        let group_id = 0;
        let binding_id = 0;

        let wgsl = generate_wgsl_string(
            Some(struct_def),
            bind_type,
            var_name,
            var_type,
            group_id,
            binding_id,
            None,
        );
        assert!(wgsl.contains("@group(0) @binding(0)"));
    }
}
