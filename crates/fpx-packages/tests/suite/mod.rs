mod fs_cache;
