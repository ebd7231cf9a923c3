//! Captured `xrandr --props` reports shared by tests

/// Laptop panel only, external connectors empty
pub const LAPTOP: &str = concat!(
    "Screen 0: minimum 320 x 200, current 1920 x 1080, maximum 8192 x 8192\n",
    "eDP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 346mm x 194mm\n",
    "\tEDID: \n",
    "\t\t00ffffffffffff004d10531400000000\n",
    "\t\t28190104a52313780ede50a3544c9926\n",
    "\tscaling mode: Full aspect \n",
    "\t\tsupported: Full, Center, Full aspect\n",
    "\tlink-status: Good \n",
    "\t\tsupported: Good, Bad\n",
    "\tCONNECTOR_ID: 59 \n",
    "\t\tsupported: 59\n",
    "   1920x1080     59.93*+\n",
    "   1680x1050     59.95    59.88  \n",
    "   1280x720      60.00    59.99    59.86    59.74  \n",
    "DP-1 disconnected (normal left inverted right x axis y axis)\n",
    "\tlink-status: Good \n",
    "\t\tsupported: Good, Bad\n",
    "\tCONNECTOR_ID: 66 \n",
    "\t\tsupported: 66\n",
    "HDMI-1 disconnected (normal left inverted right x axis y axis)\n",
    "\taspect ratio: Automatic \n",
    "\t\tsupported: Automatic, 4:3, 16:9\n",
    "\taudio: auto \n",
    "\t\tsupported: force-dvi, off, auto, on\n",
    "\tCONNECTOR_ID: 71 \n",
    "\t\tsupported: 71\n",
);

/// Laptop panel plus an external monitor on HDMI-1 that has not been enabled yet
pub const DOCKED: &str = concat!(
    "Screen 0: minimum 320 x 200, current 1920 x 1080, maximum 8192 x 8192\n",
    "eDP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 346mm x 194mm\n",
    "\tEDID: \n",
    "\t\t00ffffffffffff004d10531400000000\n",
    "\t\t28190104a52313780ede50a3544c9926\n",
    "\tlink-status: Good \n",
    "\t\tsupported: Good, Bad\n",
    "\tCONNECTOR_ID: 59 \n",
    "\t\tsupported: 59\n",
    "   1920x1080     59.93*+\n",
    "   1280x720      60.00    59.94  \n",
    "DP-1 disconnected (normal left inverted right x axis y axis)\n",
    "\tlink-status: Good \n",
    "\t\tsupported: Good, Bad\n",
    "\tCONNECTOR_ID: 66 \n",
    "\t\tsupported: 66\n",
    "HDMI-1 connected (normal left inverted right x axis y axis) 597mm x 336mm\n",
    "\tEDID: \n",
    "\t\t00ffffffffffff0010acf0a04c383930\n",
    "\t\t0b1e0104a53c22783ae5d5a7554d9d25\n",
    "\tlink-status: Good \n",
    "\t\tsupported: Good, Bad\n",
    "\tCONNECTOR_ID: 71 \n",
    "\t\tsupported: 71\n",
    "   2560x1440     59.95 +  74.97  \n",
    "   1920x1080     60.00    59.94  \n",
);

/// Same hardware as [`DOCKED`], after the external monitor was arranged
/// left of the panel
pub const DOCKED_ARRANGED: &str = concat!(
    "Screen 0: minimum 320 x 200, current 4480 x 1440, maximum 8192 x 8192\n",
    "eDP-1 connected 1920x1080+2560+0 (normal left inverted right x axis y axis) 346mm x 194mm\n",
    "\tEDID: \n",
    "\t\t00ffffffffffff004d10531400000000\n",
    "\t\t28190104a52313780ede50a3544c9926\n",
    "\tlink-status: Good \n",
    "\t\tsupported: Good, Bad\n",
    "\tCONNECTOR_ID: 59 \n",
    "\t\tsupported: 59\n",
    "   1920x1080     59.93*+\n",
    "   1280x720      60.00    59.94  \n",
    "DP-1 disconnected (normal left inverted right x axis y axis)\n",
    "\tlink-status: Good \n",
    "\t\tsupported: Good, Bad\n",
    "\tCONNECTOR_ID: 66 \n",
    "\t\tsupported: 66\n",
    "HDMI-1 connected primary 2560x1440+0+0 (normal left inverted right x axis y axis) 597mm x 336mm\n",
    "\tEDID: \n",
    "\t\t00ffffffffffff0010acf0a04c383930\n",
    "\t\t0b1e0104a53c22783ae5d5a7554d9d25\n",
    "\tlink-status: Good \n",
    "\t\tsupported: Good, Bad\n",
    "\tCONNECTOR_ID: 71 \n",
    "\t\tsupported: 71\n",
    "   2560x1440     59.95*+  74.97  \n",
    "   1920x1080     60.00    59.94  \n",
);
